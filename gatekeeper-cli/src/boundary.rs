//! Process boundary adapter: one JSON request in, one JSON response out.
//!
//! # Request
//!
//! ```text
//! {"function": "scan_repository", "args": {"repo_url": "...", "server_name": "..."}}
//! {"function": "get_server",      "args": {"server_name": "..."}}
//! {"function": "list_servers",    "args": {}}
//! {"function": "upsert_server",   "args": {"server_data": {...}}}
//! {"function": "delete_server",   "args": {"server_name": "..."}}
//! ```
//!
//! # Response
//!
//! `scan_repository` answers with the serialized [`PipelineOutcome`]. Registry
//! functions answer `{"success": true, "data": ...}`. Any failure, including an
//! undecodable request or a panic inside a handler, becomes
//! `{"success": false, "error": "..."}`.

use std::io::{Read, Write};
use std::sync::Arc;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use tracing::{debug, error, info};

use gatekeeper_core::types::{PipelineOutcome, ScanRequest};
use gatekeeper_registry::{RegistryStore, ServerRecord};
use gatekeeper_scanner::RepositoryScanner;

use crate::error::CliError;

/// Decoded boundary request.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    ScanRepository { repo_url: String, server_name: String },
    GetServer { server_name: String },
    ListServers,
    UpsertServer { server_data: Value },
    DeleteServer { server_name: String },
}

#[derive(Deserialize)]
struct Envelope {
    function: String,
    #[serde(default)]
    args: Value,
}

#[derive(Deserialize)]
struct ScanRepositoryArgs {
    repo_url: String,
    server_name: String,
}

#[derive(Deserialize)]
struct ServerNameArgs {
    server_name: String,
}

#[derive(Deserialize)]
struct UpsertArgs {
    server_data: Value,
}

impl Request {
    /// Decode a raw request document.
    ///
    /// # Errors
    ///
    /// Returns a message prefixed with `invalid request:` for malformed JSON,
    /// unknown functions and missing or mistyped arguments.
    pub fn decode(raw: &str) -> Result<Self, String> {
        let envelope: Envelope =
            serde_json::from_str(raw).map_err(|e| format!("invalid request: {e}"))?;
        let args = match envelope.args {
            Value::Null => Value::Object(Default::default()),
            other => other,
        };

        fn args_of<T: serde::de::DeserializeOwned>(
            function: &str,
            args: Value,
        ) -> Result<T, String> {
            serde_json::from_value(args)
                .map_err(|e| format!("invalid request: bad arguments for '{function}': {e}"))
        }

        let function = envelope.function.as_str();
        match function {
            "scan_repository" => {
                let a: ScanRepositoryArgs = args_of(function, args)?;
                Ok(Self::ScanRepository {
                    repo_url: a.repo_url,
                    server_name: a.server_name,
                })
            }
            "get_server" => {
                let a: ServerNameArgs = args_of(function, args)?;
                Ok(Self::GetServer {
                    server_name: a.server_name,
                })
            }
            "list_servers" => Ok(Self::ListServers),
            "upsert_server" => {
                let a: UpsertArgs = args_of(function, args)?;
                Ok(Self::UpsertServer {
                    server_data: a.server_data,
                })
            }
            "delete_server" => {
                let a: ServerNameArgs = args_of(function, args)?;
                Ok(Self::DeleteServer {
                    server_name: a.server_name,
                })
            }
            other => Err(format!("invalid request: unknown function '{other}'")),
        }
    }

    /// Function name as it appears on the wire.
    pub fn function(&self) -> &'static str {
        match self {
            Self::ScanRepository { .. } => "scan_repository",
            Self::GetServer { .. } => "get_server",
            Self::ListServers => "list_servers",
            Self::UpsertServer { .. } => "upsert_server",
            Self::DeleteServer { .. } => "delete_server",
        }
    }
}

/// Boundary response; exactly one is written per invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// Result of `scan_repository`.
    Scan(PipelineOutcome),
    /// Successful registry call.
    Data(Value),
    /// Any other failure.
    Error(String),
}

impl Response {
    /// Whether the response carries `"success": true`.
    pub fn is_success(&self) -> bool {
        match self {
            Self::Scan(outcome) => outcome.is_success(),
            Self::Data(_) => true,
            Self::Error(_) => false,
        }
    }
}

impl Serialize for Response {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Scan(outcome) => outcome.serialize(serializer),
            Self::Data(data) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("success", &true)?;
                map.serialize_entry("data", data)?;
                map.end()
            }
            Self::Error(error) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("success", &false)?;
                map.serialize_entry("error", error)?;
                map.end()
            }
        }
    }
}

/// Routes decoded requests to the scan pipeline or the registry.
pub struct Dispatcher<P, R> {
    scanner: P,
    registry: R,
}

impl<P, R> Dispatcher<P, R>
where
    P: RepositoryScanner,
    R: RegistryStore,
{
    pub fn new(scanner: P, registry: R) -> Self {
        Self { scanner, registry }
    }

    /// Decode and handle one raw request.
    pub async fn handle_raw(&self, raw: &str) -> Response {
        match Request::decode(raw) {
            Ok(request) => self.handle(request).await,
            Err(message) => {
                debug!(error = %message, "rejected boundary request");
                Response::Error(message)
            }
        }
    }

    /// Handle one decoded request.
    pub async fn handle(&self, request: Request) -> Response {
        info!(function = request.function(), "handling boundary request");
        match request {
            Request::ScanRepository {
                repo_url,
                server_name,
            } => {
                let request = ScanRequest::new(repo_url, server_name);
                Response::Scan(self.scanner.scan_repository(&request).await)
            }
            Request::GetServer { server_name } => {
                registry_reply(self.registry.get(&server_name).await)
            }
            Request::ListServers => registry_reply(self.registry.list().await),
            Request::UpsertServer { server_data } => match ServerRecord::from_value(server_data) {
                Ok(record) => registry_reply(self.registry.upsert(record).await),
                Err(e) => Response::Error(e.to_string()),
            },
            Request::DeleteServer { server_name } => {
                match self.registry.delete(&server_name).await {
                    Ok(()) => Response::Data(serde_json::json!({ "deleted": server_name })),
                    Err(e) => Response::Error(e.to_string()),
                }
            }
        }
    }
}

impl<P, R> Dispatcher<P, R>
where
    P: RepositoryScanner + 'static,
    R: RegistryStore + 'static,
{
    /// Handle a request on its own task so a panic in any stage still yields a response.
    pub async fn handle_guarded(self: Arc<Self>, raw: String) -> Response {
        let task = tokio::spawn(async move { self.handle_raw(&raw).await });
        match task.await {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, "boundary handler did not complete");
                Response::Error(format!("internal error: {e}"))
            }
        }
    }
}

fn registry_reply<T: Serialize>(result: Result<T, gatekeeper_core::RegistryError>) -> Response {
    match result.map(serde_json::to_value) {
        Ok(Ok(data)) => Response::Data(data),
        Ok(Err(e)) => Response::Error(format!("failed to encode registry data: {e}")),
        Err(e) => Response::Error(e.to_string()),
    }
}

/// Read the request from the inline argument, or from `input` when absent.
pub fn read_request(inline: Option<String>, input: &mut dyn Read) -> Result<String, CliError> {
    match inline {
        Some(raw) => Ok(raw),
        None => {
            let mut raw = String::new();
            input.read_to_string(&mut raw)?;
            Ok(raw)
        }
    }
}

/// Write the response as a single compact JSON line.
pub fn write_response(w: &mut dyn Write, response: &Response) -> Result<(), CliError> {
    serde_json::to_writer(&mut *w, response)?;
    writeln!(w)?;
    w.flush()?;
    Ok(())
}
