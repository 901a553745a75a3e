use crate::routes::{chat, health, v1};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(info(
    title = "aichat-server",
    description = "Chat completion gateway and conversation history API",
    version = "0.1.0"
))]
pub struct ApiDoc;

pub fn get_docs() -> utoipa::openapi::OpenApi {
    let mut root = ApiDoc::openapi();
    root.merge(health::HealthApi::openapi());
    root.merge(chat::ChatApi::openapi());
    root.merge(v1::api_docs());
    root
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = get_docs();
        for path in ["/health", "/chat", "/v1/conversations", "/v1/conversations/{id}/messages", "/v1/profile"] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
