use crate::engine::EngineArgs;
use anyhow::Result;
use clap::Args;
use kestrel_core::session::SessionRegistry;
use kestrel_server::server::{DEFAULT_BODY_LIMIT, DEFAULT_HOST, DEFAULT_PORT};
use kestrel_server::{AnalysisServer, AppState, ServerConfig};

#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long, env = "KESTREL_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Largest accepted request body in bytes
    #[arg(long, env = "KESTREL_BODY_LIMIT", default_value_t = DEFAULT_BODY_LIMIT, value_name = "BYTES")]
    pub body_limit: usize,
}

impl ServeArgs {
    pub fn config(&self) -> ServerConfig {
        ServerConfig {
            host: self.host.clone(),
            port: self.port,
            body_limit: self.body_limit,
        }
    }
}

pub fn execute(args: &ServeArgs, engine: &EngineArgs) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let server = AnalysisServer::bind(&args.config()).await?;
        let registry = SessionRegistry::new();
        let orchestrator = engine.orchestrator(registry.clone(), &server.base_url());

        println!("✓ Kestrel listening on http://{}", server.local_addr());
        println!("  POST /analyse?performanceRequired=true|false");
        println!();
        println!("Press Ctrl+C to stop...");

        server.serve(AppState::new(orchestrator, registry)).await?;

        println!("✅ Server stopped gracefully");
        Ok(())
    })
}
