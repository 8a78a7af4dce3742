//! CLI command implementations.

pub mod init;
pub mod update;
pub mod watch;

use std::path::Path;
use std::sync::Arc;

use otapull::config::ConfigFile;
use otapull::transport::TcpTransport;
use otapull::writer::ImageFileWriterFactory;
use otapull::UpdateClient;

/// Assemble the update client used by `update` and `watch`: plaintext TCP
/// transport, file-staging writer, identity and TLS settings from the
/// configuration.
pub(crate) fn build_client(config: &ConfigFile, output: &Path) -> Arc<UpdateClient> {
    let mut client = UpdateClient::new(
        Arc::new(TcpTransport::new()),
        Arc::new(ImageFileWriterFactory::new(output)),
        config.device.clone(),
    );
    if let Some(tls) = config.tls_config() {
        client = client.with_tls(tls);
    }
    Arc::new(client)
}
