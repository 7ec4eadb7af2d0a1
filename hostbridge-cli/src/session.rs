use std::sync::Arc;

use hostbridge_core::{in_process, Bridge, BridgeConfig, ChannelTransport};
use hostbridge_host::{serve, Dispatcher, ServeOptions, ServeStats};
use tokio::task::JoinHandle;

/// A host served on this runtime and a bridge connected to it.
pub struct Session {
    pub bridge: Bridge<ChannelTransport>,
    host: JoinHandle<ServeStats>,
    router: JoinHandle<()>,
}

impl Session {
    pub fn start(dispatcher: Dispatcher, config: &BridgeConfig) -> Self {
        let (transport, router, link) = in_process();
        let router = tokio::spawn(router.run());
        let host = tokio::spawn(serve(Arc::new(dispatcher), link, ServeOptions::from(config)));
        let bridge = Bridge::from_config(transport, config);
        log::debug!(
            "session started (timeout {:?}, max in flight {})",
            bridge.default_timeout(),
            config.max_in_flight
        );
        Self { bridge, host, router }
    }

    /// Close the link and wait for the host to answer everything it accepted.
    pub async fn shutdown(self) -> anyhow::Result<ServeStats> {
        let Self { bridge, host, router } = self;
        drop(bridge);
        let stats = host.await?;
        router.await?;
        log::debug!("session closed: {stats:?}");
        Ok(stats)
    }
}
