//! 메트릭 상수 및 설명 등록
//!
//! 모든 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 파이프라인은 이 상수를 사용하여 `metrics::counter!()`, `metrics::histogram!()`
//! 매크로를 호출합니다. exporter는 설치하지 않으며, recorder가 없으면 기록은 무시됩니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `gatekeeper_`
//! - 접미어: `_total` (counter), `_seconds` (histogram)
//!
//! # 사용 예시
//!
//! ```ignore
//! use gatekeeper_core::metrics;
//!
//! metrics::counter!(gatekeeper_core::metrics::SCANS_STARTED_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 스캐너 레이블 키 (static_analysis, secret_scan, lint)
pub const LABEL_SCANNER: &str = "scanner";

/// 실패 종류 레이블 키 (tool_missing, timeout, invalid_output, execution_failed)
pub const LABEL_KIND: &str = "kind";

/// 실패 단계 레이블 키 (fetch, static_analysis)
pub const LABEL_STAGE: &str = "stage";

// ─── 스캔 파이프라인 메트릭 ────────────────────────────────────────

/// 시작된 스캔 수 (counter)
pub const SCANS_STARTED_TOTAL: &str = "gatekeeper_scans_started_total";

/// 성공한 스캔 수 (counter)
pub const SCANS_SUCCEEDED_TOTAL: &str = "gatekeeper_scans_succeeded_total";

/// 실패한 스캔 수 (counter, label: stage)
pub const SCANS_FAILED_TOTAL: &str = "gatekeeper_scans_failed_total";

/// best-effort 스캐너가 기본값으로 대체된 횟수 (counter, label: scanner, kind)
pub const SCANNER_FALLBACKS_TOTAL: &str = "gatekeeper_scanner_fallbacks_total";

/// 스캔 전체 소요 시간 (histogram, 초)
pub const SCAN_DURATION_SECONDS: &str = "gatekeeper_scan_duration_seconds";

/// 발견된 도구 수 (histogram)
pub const TOOLS_DISCOVERED: &str = "gatekeeper_tools_discovered";

/// 스캔 소요 시간 히스토그램 버킷 (초)
///
/// clone과 외부 분석기 실행을 포함하므로 수 초에서 수 분 범위입니다.
pub const SCAN_DURATION_BUCKETS: &[f64] = &[1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0];

/// 정의된 모든 메트릭 이름
pub const ALL_METRIC_NAMES: &[&str] = &[
    SCANS_STARTED_TOTAL,
    SCANS_SUCCEEDED_TOTAL,
    SCANS_FAILED_TOTAL,
    SCANNER_FALLBACKS_TOTAL,
    SCAN_DURATION_SECONDS,
    TOOLS_DISCOVERED,
];

/// 모든 메트릭의 설명을 등록합니다.
///
/// recorder 설치 이후 한 번 호출합니다. recorder가 없어도 안전합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_histogram};

    describe_counter!(SCANS_STARTED_TOTAL, "Total number of repository scans started");
    describe_counter!(
        SCANS_SUCCEEDED_TOTAL,
        "Total number of scans that produced a security report"
    );
    describe_counter!(
        SCANS_FAILED_TOTAL,
        "Total number of scans that failed (fetch or static analysis)"
    );
    describe_counter!(
        SCANNER_FALLBACKS_TOTAL,
        "Best-effort scanner failures replaced by empty results"
    );
    describe_histogram!(
        SCAN_DURATION_SECONDS,
        "End-to-end scan duration in seconds"
    );
    describe_histogram!(TOOLS_DISCOVERED, "Number of tools discovered per scan");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_metrics_start_with_gatekeeper_prefix() {
        for name in ALL_METRIC_NAMES {
            assert!(
                name.starts_with("gatekeeper_"),
                "Metric '{}' does not start with 'gatekeeper_' prefix",
                name
            );
        }
    }

    #[test]
    fn metric_names_are_unique() {
        let mut names = ALL_METRIC_NAMES.to_vec();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), ALL_METRIC_NAMES.len());
    }

    #[test]
    fn describe_all_does_not_panic() {
        describe_all();
    }

    #[test]
    fn label_keys_are_lowercase() {
        for label in [LABEL_SCANNER, LABEL_KIND, LABEL_STAGE] {
            assert_eq!(label.to_lowercase(), label);
        }
    }

    #[test]
    fn scan_duration_buckets_are_sorted() {
        let buckets = SCAN_DURATION_BUCKETS;
        for i in 1..buckets.len() {
            assert!(
                buckets[i] > buckets[i - 1],
                "Bucket values must be in ascending order"
            );
        }
    }
}
