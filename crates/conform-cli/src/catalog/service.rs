//! In-memory service the built-in suites run against
//!
//! Speaks a small JSON request/response protocol: password logins issue
//! bearer tokens, and a capacity-limited key/value store accepts writes from
//! authenticated sessions only.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

/// Keys the store accepts before refusing new ones
pub const DEFAULT_CAPACITY: usize = 8;

/// A protocol request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum Request {
    Login {
        user: String,
        password: String,
    },
    Whoami {
        token: String,
    },
    Logout {
        token: String,
    },
    Put {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        token: Option<String>,
        key: String,
        value: String,
    },
    Get {
        key: String,
    },
    Delete {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        token: Option<String>,
        key: String,
    },
}

/// A protocol response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub status: u16,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub body: Value,
}

impl Response {
    fn status(status: u16) -> Self {
        Self {
            status,
            body: Value::Null,
        }
    }

    fn with_body(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    /// A string field of the body
    pub fn field(&self, name: &str) -> Option<&str> {
        self.body.get(name).and_then(Value::as_str)
    }
}

#[derive(Debug, Default)]
struct State {
    sessions: HashMap<String, String>,
    values: BTreeMap<String, String>,
    issued: u64,
}

/// The service under test
#[derive(Debug)]
pub struct FakeService {
    users: BTreeMap<String, String>,
    capacity: usize,
    state: Mutex<State>,
}

impl FakeService {
    /// A service with the stock accounts (`alice`, `bob`)
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let users = [("alice", "wonderland"), ("bob", "builder")]
            .into_iter()
            .map(|(user, password)| (user.to_string(), password.to_string()))
            .collect();
        Self {
            users,
            capacity,
            state: Mutex::new(State::default()),
        }
    }

    /// Handle one request
    pub fn handle(&self, request: &Request) -> Response {
        // A body that panicked mid-request leaves the state usable
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        match request {
            Request::Login { user, password } => {
                if self.users.get(user) != Some(password) {
                    return Response::with_body(401, json!({ "error": "invalid credentials" }));
                }
                state.issued += 1;
                let token = format!("tok-{}", state.issued);
                state.sessions.insert(token.clone(), user.clone());
                Response::with_body(200, json!({ "token": token }))
            }
            Request::Whoami { token } => match state.sessions.get(token) {
                Some(user) => Response::with_body(200, json!({ "user": user })),
                None => Response::status(401),
            },
            Request::Logout { token } => match state.sessions.remove(token) {
                Some(_) => Response::status(204),
                None => Response::status(401),
            },
            Request::Put { token, key, value } => {
                if !authorized(&state, token.as_deref()) {
                    return Response::status(401);
                }
                if !state.values.contains_key(key) && state.values.len() >= self.capacity {
                    return Response::with_body(507, json!({ "error": "store is full" }));
                }
                state.values.insert(key.clone(), value.clone());
                Response::status(200)
            }
            Request::Get { key } => match state.values.get(key) {
                Some(value) => Response::with_body(200, json!({ "value": value })),
                None => Response::status(404),
            },
            Request::Delete { token, key } => {
                if !authorized(&state, token.as_deref()) {
                    return Response::status(401);
                }
                match state.values.remove(key) {
                    Some(_) => Response::status(204),
                    None => Response::status(404),
                }
            }
        }
    }
}

impl Default for FakeService {
    fn default() -> Self {
        Self::new()
    }
}

fn authorized(state: &State, token: Option<&str>) -> bool {
    token.map_or(false, |t| state.sessions.contains_key(t))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn login(service: &FakeService, user: &str, password: &str) -> Response {
        service.handle(&Request::Login {
            user: user.to_string(),
            password: password.to_string(),
        })
    }

    #[test]
    fn test_login_issues_distinct_tokens() {
        let service = FakeService::new();
        let first = login(&service, "alice", "wonderland");
        let second = login(&service, "alice", "wonderland");

        assert_eq!(first.status, 200);
        assert_ne!(first.field("token"), second.field("token"));
    }

    #[test]
    fn test_login_rejects_bad_password() {
        let service = FakeService::new();
        assert_eq!(login(&service, "alice", "nope").status, 401);
        assert_eq!(login(&service, "mallory", "wonderland").status, 401);
    }

    #[test]
    fn test_logout_revokes_token() {
        let service = FakeService::new();
        let token = login(&service, "bob", "builder")
            .field("token")
            .unwrap()
            .to_string();

        let whoami = Request::Whoami {
            token: token.clone(),
        };
        assert_eq!(service.handle(&whoami).field("user"), Some("bob"));
        assert_eq!(service.handle(&Request::Logout { token }).status, 204);
        assert_eq!(service.handle(&whoami).status, 401);
    }

    #[test]
    fn test_store_requires_token_and_enforces_capacity() {
        let service = FakeService::with_capacity(1);
        let token = login(&service, "bob", "builder")
            .field("token")
            .map(str::to_string);

        let put = |key: &str, token: Option<String>| {
            service
                .handle(&Request::Put {
                    token,
                    key: key.to_string(),
                    value: "v".to_string(),
                })
                .status
        };

        assert_eq!(put("a", None), 401);
        assert_eq!(put("a", token.clone()), 200);
        assert_eq!(put("a", token.clone()), 200);
        assert_eq!(put("b", token), 507);
    }

    #[test]
    fn test_request_wire_format() {
        let request = Request::Put {
            token: None,
            key: "k".to_string(),
            value: "v".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({ "op": "put", "key": "k", "value": "v" })
        );
    }
}
