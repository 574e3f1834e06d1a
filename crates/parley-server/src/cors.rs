use http::Method;
use http::header::HeaderName;
use parley_config::{AllowList, CorsConfig};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

/// CORS layer for a browser frontend hosted on another origin
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let mut layer = match &config.origins {
        AllowList::Any => CorsLayer::new().allow_origin(AllowOrigin::any()),
        AllowList::Only(origins) => {
            let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            CorsLayer::new().allow_origin(origins)
        }
    };

    layer = match &config.methods {
        AllowList::Any => layer.allow_methods(AllowMethods::any()),
        AllowList::Only(methods) => {
            let methods: Vec<Method> = methods.iter().filter_map(|m| m.parse().ok()).collect();
            layer.allow_methods(methods)
        }
    };

    layer = match &config.headers {
        AllowList::Any => layer.allow_headers(AllowHeaders::any()),
        AllowList::Only(headers) => {
            let headers: Vec<HeaderName> = headers.iter().filter_map(|h| h.parse().ok()).collect();
            layer.allow_headers(headers)
        }
    };

    if config.credentials {
        layer = layer.allow_credentials(true);
    }

    if let Some(max_age) = config.max_age_duration() {
        layer = layer.max_age(max_age);
    }

    layer
}
