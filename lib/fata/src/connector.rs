//! TLS-capable connector for the hyper transport.

use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::connect::HttpConnector;

use crate::TransportConfig;

/// Connector trusting the Mozilla roots, speaking HTTP/1.1 and HTTP/2.
///
/// Plain `http://` is accepted unless [`TransportConfig::https_only`] is set.
#[must_use]
pub fn https_connector(config: &TransportConfig) -> HttpsConnector<HttpConnector> {
    let roots: rustls::RootCertStore = webpki_roots::TLS_SERVER_ROOTS.iter().cloned().collect();
    let tls = rustls::ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();

    let mut tcp = HttpConnector::new();
    tcp.enforce_http(false);
    tcp.set_nodelay(config.tcp_nodelay);
    tcp.set_connect_timeout(config.connect_timeout);

    let builder = HttpsConnectorBuilder::new().with_tls_config(tls);
    let builder = if config.https_only {
        builder.https_only()
    } else {
        builder.https_or_http()
    };
    builder.enable_http1().enable_http2().wrap_connector(tcp)
}
