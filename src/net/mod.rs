//! 网络层：退避原语、传输接缝、弹性请求层与片段持久化客户端。

pub mod api;
pub mod backoff;
pub mod fetcher;
pub mod transport;

pub use api::{
    Choice, DeletedSnippet, PreparedSnippet, SESSION_COOKIE, Snippet, SnippetClient, SnippetPatch,
};
pub use backoff::{BackoffPolicy, RetryState};
pub use fetcher::{DEFAULT_RETRY_COUNT, RETRY_DELAY_MS, ResilientFetcher, fetch_with_timeout};
pub use transport::{ApiRequest, ApiResponse, HttpMethod, HttpTransport, ReqwestTransport};
