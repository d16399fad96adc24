//! 도구 탐색 -- checkout 소스 트리에서 선언된 MCP 도구 이름 추출
//!
//! 저장소 코드를 실행하지 않고 텍스트 패턴만으로 도구 등록 지점을 찾습니다.
//!
//! # 인식하는 패턴
//!
//! - Python: `@mcp.tool()` 류의 데코레이터. `name="..."` 인자가 있으면 그 값을,
//!   없으면 바로 아래 함수 이름을 사용합니다.
//! - JavaScript/TypeScript: `server.tool("name", ...)`, `registerTool("name", ...)`
//!
//! 탐색 실패는 파이프라인을 중단시키지 않습니다. 읽을 수 없는 파일은 건너뛰고,
//! 트리 자체를 읽을 수 없으면 빈 [`ToolManifest`]를 반환합니다.

use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use gatekeeper_core::config::DiscoveryConfig;
use gatekeeper_core::types::ToolManifest;

static PY_TOOL_DECORATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*@\s*[A-Za-z_][\w.]*\.tool\b(?P<rest>.*)$").expect("valid decorator regex")
});

static PY_NAME_KWARG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\bname\s*=\s*["']([^"']+)["']"#).expect("valid name kwarg regex")
});

static PY_DEF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:async\s+)?def\s+([A-Za-z_]\w*)").expect("valid def regex")
});

static JS_TOOL_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:\.tool|\bregisterTool)\s*\(\s*["'`]([^"'`]+)["'`]"#)
        .expect("valid tool call regex")
});

const PY_EXTENSIONS: &[&str] = &["py"];
const JS_EXTENSIONS: &[&str] = &["js", "mjs", "cjs", "jsx", "ts", "mts", "cts", "tsx"];

/// 정적 도구 탐색기
#[derive(Debug, Clone)]
pub struct ToolDiscovery {
    max_file_size: u64,
    max_files: usize,
    skip_dirs: Vec<String>,
}

impl ToolDiscovery {
    /// 설정에서 탐색기를 생성합니다.
    pub fn new(config: &DiscoveryConfig) -> Self {
        Self {
            max_file_size: config.max_file_size,
            max_files: config.max_files,
            skip_dirs: config.skip_dirs.clone(),
        }
    }

    /// 소스 트리를 탐색합니다 (blocking I/O는 별도 스레드에서 수행).
    pub async fn discover(&self, root: &Path) -> ToolManifest {
        let discovery = self.clone();
        let root = root.to_path_buf();
        match tokio::task::spawn_blocking(move || discovery.discover_blocking(&root)).await {
            Ok(manifest) => manifest,
            Err(e) => {
                warn!(error = %e, "tool discovery task failed, using empty manifest");
                ToolManifest::empty()
            }
        }
    }

    /// 소스 트리를 동기적으로 탐색합니다.
    ///
    /// 파일은 이름 순으로 방문하며, 중복 이름은 처음 발견된 순서를 유지한 채 제거됩니다.
    pub fn discover_blocking(&self, root: &Path) -> ToolManifest {
        let mut names: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut visited = 0usize;

        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !self.is_skipped_dir(entry));

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    debug!(error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let Some(language) = Language::from_path(entry.path()) else {
                continue;
            };

            visited += 1;
            if visited > self.max_files {
                warn!(max_files = self.max_files, "file limit reached, stopping discovery");
                break;
            }

            let Some(source) = self.read_source(entry.path()) else {
                continue;
            };

            let found = match language {
                Language::Python => python_tools(&source),
                Language::JavaScript => javascript_tools(&source),
            };
            for name in found {
                if seen.insert(name.clone()) {
                    names.push(name);
                }
            }
        }

        debug!(tools = names.len(), files = visited, "tool discovery finished");
        ToolManifest::new(names)
    }

    fn is_skipped_dir(&self, entry: &DirEntry) -> bool {
        entry.depth() > 0
            && entry.file_type().is_dir()
            && entry
                .file_name()
                .to_str()
                .is_some_and(|name| self.skip_dirs.iter().any(|skip| skip == name))
    }

    fn read_source(&self, path: &Path) -> Option<String> {
        let metadata = std::fs::metadata(path).ok()?;
        if metadata.len() > self.max_file_size {
            debug!(
                path = %path.display(),
                size = metadata.len(),
                max = self.max_file_size,
                "file too large, skipping"
            );
            return None;
        }
        let bytes = std::fs::read(path).ok()?;
        String::from_utf8(bytes).ok()
    }
}

#[derive(Debug, Clone, Copy)]
enum Language {
    Python,
    JavaScript,
}

impl Language {
    fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        if PY_EXTENSIONS.contains(&ext) {
            Some(Self::Python)
        } else if JS_EXTENSIONS.contains(&ext) {
            Some(Self::JavaScript)
        } else {
            None
        }
    }
}

/// Python 소스에서 도구 데코레이터가 붙은 함수를 찾습니다.
///
/// 데코레이터 인자가 여러 줄에 걸쳐 있어도 괄호가 닫히기 전까지의 `name=`을 인식합니다.
/// 함께 쌓인 다른 데코레이터의 인자는 이름으로 쓰지 않습니다.
fn python_tools(source: &str) -> Vec<String> {
    let mut tools = Vec::new();
    let mut pending: Option<PendingTool> = None;

    for line in source.lines() {
        if let Some(caps) = PY_TOOL_DECORATOR.captures(line) {
            let rest = caps.name("rest").map_or("", |m| m.as_str());
            pending = Some(PendingTool {
                explicit: PY_NAME_KWARG.captures(rest).map(|c| c[1].to_owned()),
                open_parens: paren_balance(rest),
            });
            continue;
        }

        let Some(tool) = pending.as_mut() else {
            continue;
        };

        if let Some(caps) = PY_DEF.captures(line) {
            let name = tool.explicit.take().unwrap_or_else(|| caps[1].to_owned());
            tools.push(name);
            pending = None;
        } else if tool.open_parens > 0 {
            if tool.explicit.is_none() {
                if let Some(caps) = PY_NAME_KWARG.captures(line) {
                    tool.explicit = Some(caps[1].to_owned());
                }
            }
            tool.open_parens += paren_balance(line);
        } else if line.trim_start().starts_with('@') {
            // 다른 데코레이터: def까지 계속 대기
            tool.open_parens = 0;
        }
    }

    tools
}

/// `def`를 기다리는 도구 데코레이터
struct PendingTool {
    explicit: Option<String>,
    open_parens: i64,
}

fn paren_balance(text: &str) -> i64 {
    text.chars().fold(0, |acc, c| match c {
        '(' => acc + 1,
        ')' => acc - 1,
        _ => acc,
    })
}

fn javascript_tools(source: &str) -> Vec<String> {
    JS_TOOL_CALL
        .captures_iter(source)
        .map(|caps| caps[1].to_owned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn discovery() -> ToolDiscovery {
        ToolDiscovery::new(&DiscoveryConfig::default())
    }

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn python_decorator_uses_function_name() {
        let src = r#"
from mcp.server.fastmcp import FastMCP
mcp = FastMCP("weather")

@mcp.tool()
async def get_forecast(lat: float, lon: float) -> str:
    return "sunny"

@mcp.tool
def get_alerts(state: str) -> str:
    return ""
"#;
        assert_eq!(python_tools(src), vec!["get_forecast", "get_alerts"]);
    }

    #[test]
    fn python_explicit_name_wins() {
        let src = r#"
@server.tool(name="search_docs", description="Search")
def search(query):
    pass

@app.tool(
    description="multi-line",
    name='fetch_page',
)
def fetch(url):
    pass
"#;
        assert_eq!(python_tools(src), vec!["search_docs", "fetch_page"]);
    }

    #[test]
    fn python_ignores_other_decorators() {
        let src = r#"
@app.route("/health")
def health():
    pass

@staticmethod
def helper():
    pass
"#;
        assert!(python_tools(src).is_empty());
    }

    #[test]
    fn python_stacked_decorators() {
        let src = r#"
@mcp.tool()
@log_calls
def list_files(path):
    pass
"#;
        assert_eq!(python_tools(src), vec!["list_files"]);
    }

    #[test]
    fn python_name_kwarg_of_other_decorator_is_ignored() {
        let src = r#"
@mcp.tool()
@log_calls(name="audit")
def get_weather(city):
    pass

@mcp.tool()
@retry(
    name="backoff",
)
def get_alerts(state):
    pass
"#;
        assert_eq!(python_tools(src), vec!["get_weather", "get_alerts"]);
    }

    #[test]
    fn python_multiline_tool_name_before_other_decorator() {
        let src = r#"
@mcp.tool(
    name="forecast",
)
@log_calls(name="audit")
def get_forecast(lat, lon):
    pass
"#;
        assert_eq!(python_tools(src), vec!["forecast"]);
    }

    #[test]
    fn javascript_tool_calls() {
        let src = r#"
server.tool("echo", { message: z.string() }, async ({ message }) => ({}));
server.registerTool('add', { title: "Add" }, handler);
registerTool(`multiply`, schema, handler);
const notATool = tools.get("echo");
"#;
        assert_eq!(javascript_tools(src), vec!["echo", "add", "multiply"]);
    }

    #[test]
    fn discover_walks_tree_sorted_and_deduplicates() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "b_server.py", "@mcp.tool()\ndef beta():\n    pass\n");
        write(
            dir.path(),
            "a_server.py",
            "@mcp.tool()\ndef alpha():\n    pass\n@mcp.tool()\ndef beta():\n    pass\n",
        );
        write(dir.path(), "src/index.ts", "server.tool(\"gamma\", {}, h);\n");

        let manifest = discovery().discover_blocking(dir.path());
        assert_eq!(manifest.tool_names(), ["alpha", "beta", "gamma"]);
        assert_eq!(manifest.tool_count(), 3);
    }

    #[test]
    fn discover_skips_vendor_directories() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "node_modules/sdk/index.js",
            "server.tool(\"vendored\", {}, h);\n",
        );
        write(dir.path(), ".venv/lib/x.py", "@mcp.tool()\ndef vendored():\n    pass\n");
        write(dir.path(), "main.js", "server.tool(\"real\", {}, h);\n");

        let manifest = discovery().discover_blocking(dir.path());
        assert_eq!(manifest.tool_names(), ["real"]);
    }

    #[test]
    fn discover_skips_oversize_and_non_utf8_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = DiscoveryConfig {
            max_file_size: 64,
            ..DiscoveryConfig::default()
        };
        write(
            dir.path(),
            "big.py",
            &format!("@mcp.tool()\ndef big():\n    pass\n{}", "#".repeat(100)),
        );
        std::fs::write(dir.path().join("binary.py"), [0xff, 0xfe, 0x00, 0x80]).unwrap();
        write(dir.path(), "ok.py", "@mcp.tool()\ndef ok():\n    pass\n");

        let manifest = ToolDiscovery::new(&config).discover_blocking(dir.path());
        assert_eq!(manifest.tool_names(), ["ok"]);
    }

    #[test]
    fn discover_respects_file_limit() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.py", "@mcp.tool()\ndef first():\n    pass\n");
        write(dir.path(), "b.py", "@mcp.tool()\ndef second():\n    pass\n");
        let config = DiscoveryConfig {
            max_files: 1,
            ..DiscoveryConfig::default()
        };
        let manifest = ToolDiscovery::new(&config).discover_blocking(dir.path());
        assert_eq!(manifest.tool_names(), ["first"]);
    }

    #[test]
    fn empty_tree_yields_empty_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = discovery().discover_blocking(dir.path());
        assert_eq!(manifest, ToolManifest::empty());
    }

    #[tokio::test]
    async fn missing_root_yields_empty_manifest() {
        let manifest = discovery()
            .discover(Path::new("/nonexistent/gatekeeper/checkout"))
            .await;
        assert_eq!(manifest.tool_count(), 0);
        assert!(manifest.tool_names().is_empty());
    }
}
