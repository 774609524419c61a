//! Server command implementation

use anyhow::Result;
use dre_core::{RecordStore, StoreClient};
use dre_server::{parse_api_keys, ServerConfig, API_KEYS_ENV};

pub async fn cmd_serve(store: StoreClient, host: &str, port: u16, no_auth: bool) -> Result<()> {
    println!("🚀 Starting DRE web server...");
    println!("   Store: {} ({})", store.kind(), store.location());
    println!("   Listening: http://{}:{}", host, port);

    let api_keys = parse_api_keys(&std::env::var(API_KEYS_ENV).unwrap_or_default());

    if no_auth {
        println!();
        println!("   ⚠️  Authentication DISABLED - do not expose to network!");
    } else if api_keys.is_empty() {
        println!(
            "   ⚠️  No API keys configured; set {} or every API call is rejected",
            API_KEYS_ENV
        );
    } else {
        println!("   🔑 API keys: {} configured ({})", api_keys.len(), API_KEYS_ENV);
    }

    println!();

    let config = ServerConfig {
        require_auth: !no_auth,
        allowed_origins: vec![],
        api_keys,
    };

    dre_server::serve_with_config(store, host, port, config).await
}
