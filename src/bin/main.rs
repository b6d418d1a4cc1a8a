#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::sync::OnceLock;

    use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};

    use chirp::auth::TokenService;
    use chirp::config::Config;
    use chirp::core::db::MemoryStore;

    // The native adapter keeps everything in memory; the Spin component is
    // the deployment that talks to a persistent key-value store.
    static STORE: OnceLock<MemoryStore> = OnceLock::new();

    mod adapter {
        use actix_web::HttpRequest;
        use spin_sdk::http::{Method, Request, Response};

        pub fn to_component_request(
            req: &HttpRequest,
            body: actix_web::web::Bytes,
        ) -> anyhow::Result<Request> {
            let method = match req.method().as_str() {
                "GET" => Method::Get,
                "POST" => Method::Post,
                "PUT" => Method::Put,
                "DELETE" => Method::Delete,
                "HEAD" => Method::Head,
                "OPTIONS" => Method::Options,
                "PATCH" => Method::Patch,
                _ => Method::Get,
            };

            let uri = req.uri().to_string();

            let mut builder = Request::builder();
            builder.method(method).uri(&uri);
            for (name, value) in req.headers() {
                if let Ok(val_str) = value.to_str() {
                    builder.header(name.as_str(), val_str);
                }
            }

            Ok(builder.body(body.to_vec()).build())
        }

        pub fn to_actix_response(resp: Response) -> actix_web::HttpResponse {
            let status = *resp.status();
            let body = resp.body().to_vec();

            let mut response = actix_web::HttpResponse::build(
                actix_web::http::StatusCode::from_u16(status)
                    .unwrap_or(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR),
            );

            response.body(body)
        }
    }

    async fn handle_all(req: HttpRequest, body: web::Bytes) -> HttpResponse {
        let config = Config::from_env();
        let tokens = TokenService::from_config(&config);
        let store = STORE.get_or_init(MemoryStore::new);

        let component_req = match adapter::to_component_request(&req, body) {
            Ok(r) => r,
            Err(_) => {
                return HttpResponse::BadRequest()
                    .json(serde_json::json!({"error": "Invalid request"}))
            }
        };

        match chirp::route_with(store, &tokens, component_req) {
            Ok(resp) => adapter::to_actix_response(resp),
            Err(e) => {
                tracing::error!(error = %e, "request failed");
                HttpResponse::InternalServerError()
                    .json(serde_json::json!({"error": "Internal server error"}))
            }
        }
    }

    pub async fn run() -> std::io::Result<()> {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();

        let config = Config::from_env();
        let addr = format!("{}:{}", config.host, config.port);
        tracing::info!(%addr, "listening");

        HttpServer::new(|| App::new().default_service(web::route().to(handle_all)))
            .bind(addr)?
            .run()
            .await
    }
}

#[cfg(not(target_arch = "wasm32"))]
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    native::run().await
}

#[cfg(target_arch = "wasm32")]
fn main() {}
