//! Request dispatcher.

use serde::Serialize;
use serde_json::Value;
use sqlbook_session::{QuerySession, SessionState};
use sqlbook_source::DataSource;
use tracing::{debug, info, warn};

use crate::error::{RpcError, RpcResult};
use crate::params::{optional, required};
use crate::protocol::{ErrorObject, Request, Response, JSONRPC_VERSION};

/// Maps JSON-RPC requests onto one query session.
pub struct Dispatcher<S: DataSource> {
    session: QuerySession<S>,
    finished: bool,
}

impl<S: DataSource> Dispatcher<S> {
    pub fn new(session: QuerySession<S>) -> Self {
        Self {
            session,
            finished: false,
        }
    }

    /// True once `quit` has terminated the session, even if closing the
    /// connection failed.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn session(&self) -> &QuerySession<S> {
        &self.session
    }

    /// Handle one encoded request and return the encoded response.
    pub fn handle(&mut self, payload: &[u8]) -> Vec<u8> {
        self.handle_payload(payload).to_bytes()
    }

    /// Handle one encoded request.
    pub fn handle_payload(&mut self, payload: &[u8]) -> Response {
        let value: Value = match serde_json::from_slice(payload) {
            Ok(value) => value,
            Err(err) => return fault(Value::Null, RpcError::parse(err.to_string())),
        };
        let id = value.get("id").cloned().unwrap_or(Value::Null);

        let request: Request = match serde_json::from_value(value) {
            Ok(request) => request,
            Err(err) => return fault(id, RpcError::invalid_request(err.to_string())),
        };
        if request.jsonrpc != JSONRPC_VERSION {
            return fault(
                id,
                RpcError::invalid_request(format!("unsupported jsonrpc version: {}", request.jsonrpc)),
            );
        }

        debug!(method = %request.method, "rpc request");
        match self.call(&request.method, request.params.as_ref()) {
            Ok(result) => Response::success(id, result),
            Err(err) => fault(id, err),
        }
    }

    fn call(&mut self, method: &str, params: Option<&Value>) -> RpcResult<Value> {
        match method {
            "execute" => {
                let sql: String = required(params, 0, "sql")?;
                self.session.execute(&sql)?;
                Ok(Value::Bool(true))
            }
            "metadata" => encode(self.session.metadata()?),
            "count" => encode(&self.session.count()?),
            "page" => {
                let page = match optional::<i64>(params, 0, "maxSize")? {
                    Some(size) => self.session.page(size)?,
                    None => self.session.page_default()?,
                };
                encode(&page)
            }
            "finish" => {
                self.session.finish()?;
                Ok(Value::Bool(true))
            }
            "quit" => {
                let outcome = self.session.quit();
                self.finished = self.session.state() == SessionState::Terminated;
                outcome?;
                info!("session quit over rpc");
                Ok(Value::Bool(true))
            }
            "tables" => encode(&self.session.tables()?),
            "views" => encode(&self.session.views()?),
            "columns" => {
                let catalog: Option<String> = optional(params, 0, "catalog")?;
                let schema: Option<String> = optional(params, 1, "schema")?;
                let table: Option<String> = optional(params, 2, "table")?;
                let columns = self.session.columns(
                    catalog.as_deref(),
                    schema.as_deref(),
                    table.as_deref(),
                )?;
                encode(&columns)
            }
            other => Err(RpcError::method_not_found(other)),
        }
    }
}

fn encode<T: Serialize + ?Sized>(value: &T) -> RpcResult<Value> {
    serde_json::to_value(value).map_err(|err| RpcError::internal(err.to_string()))
}

fn fault(id: Value, err: RpcError) -> Response {
    warn!(code = err.code(), kind = err.kind(), error = %err, "rpc fault");
    Response::failure(id, ErrorObject::from(&err))
}
