use std::net::{Ipv4Addr, SocketAddr};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::channel::mpsc;
use futures::Stream;
use hyper_util::rt::TokioIo;
use log::{debug, info, warn};
use tokio::net::TcpStream;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::TlsConnector;
use tonic::codec::Streaming;
use tonic::metadata::AsciiMetadataValue;
use tonic::service::interceptor::InterceptedService;
use tonic::service::Interceptor;
use tonic::transport::{Channel, Endpoint, Uri};
use tonic::{Request, Status};
use yellowstone_grpc_proto::geyser::geyser_client::GeyserClient;
use yellowstone_grpc_proto::geyser::{
    subscribe_update::UpdateOneof, SubscribeRequest, SubscribeUpdate,
};

use super::subscription::{ping_request, transactions_subscribe_request};
use super::tls::insecure_client_config;
use crate::common::{BenchError, BenchResult};
use crate::streaming::common::{
    ProviderConfig, ProviderEndpoint, StreamClientConfig, X_TOKEN_HEADER,
};

/// How the channel to a provider is secured
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportSecurity {
    Plaintext,
    /// TLS with SNI set to the hostname and certificate verification disabled
    InsecureTls,
}

impl TransportSecurity {
    pub fn for_endpoint(endpoint: &ProviderEndpoint) -> Self {
        if endpoint.is_local() {
            Self::Plaintext
        } else {
            Self::InsecureTls
        }
    }
}

/// Attaches the provider access token to every outgoing request
#[derive(Clone)]
pub struct XTokenInterceptor {
    x_token: Option<AsciiMetadataValue>,
}

impl XTokenInterceptor {
    pub fn new(token: &str, endpoint: &ProviderEndpoint) -> BenchResult<Self> {
        if token.is_empty() {
            return Ok(Self { x_token: None });
        }
        let x_token = token
            .parse::<AsciiMetadataValue>()
            .map_err(|_| BenchError::InvalidToken(endpoint.to_string()))?;
        Ok(Self { x_token: Some(x_token) })
    }
}

impl Interceptor for XTokenInterceptor {
    fn call(&mut self, mut request: Request<()>) -> Result<Request<()>, Status> {
        if let Some(x_token) = self.x_token.clone() {
            request.metadata_mut().insert(X_TOKEN_HEADER, x_token);
        }
        Ok(request)
    }
}

/// Opens one geyser subscription per provider
pub struct GeyserConnector {
    config: StreamClientConfig,
}

impl GeyserConnector {
    pub fn new(config: StreamClientConfig) -> Self {
        Self { config }
    }

    /// Resolve, connect, subscribe and send the transactions filter.
    /// Every failure here is a setup failure for the whole run.
    pub async fn connect(&self, provider: &ProviderConfig) -> BenchResult<ConnectedStream> {
        let endpoint = &provider.endpoint;
        let ip = resolve_ipv4(&endpoint.hostname, endpoint.port).await?;
        let security = TransportSecurity::for_endpoint(endpoint);
        debug!("Resolved {endpoint} to {ip}, transport {security:?}");

        let channel = self.open_channel(endpoint, ip, security).await?;
        let interceptor = XTokenInterceptor::new(&provider.token, endpoint)?;
        let mut client = GeyserClient::with_interceptor(channel, interceptor)
            .max_decoding_message_size(self.config.max_decoding_message_size);

        let (request_tx, request_rx) = mpsc::unbounded::<SubscribeRequest>();
        let updates = client
            .subscribe(request_rx)
            .await
            .map_err(|status| BenchError::Subscribe {
                endpoint: endpoint.to_string(),
                source: Box::new(status),
            })?
            .into_inner();
        info!("Subscribed for transactions to {endpoint}");

        request_tx
            .unbounded_send(transactions_subscribe_request())
            .map_err(|_| BenchError::SendFilter(endpoint.to_string()))?;

        Ok(ConnectedStream {
            endpoint: endpoint.clone(),
            updates: PingResponder::new(endpoint.to_string(), updates, request_tx),
            _client: client,
        })
    }

    async fn open_channel(
        &self,
        endpoint: &ProviderEndpoint,
        ip: Ipv4Addr,
        security: TransportSecurity,
    ) -> BenchResult<Channel> {
        let target = SocketAddr::new(ip.into(), endpoint.port);
        let transport_err =
            |source| BenchError::Transport { endpoint: endpoint.to_string(), source };

        // The connector below does its own TLS, so the URI scheme stays http
        let uri = match security {
            TransportSecurity::Plaintext => format!("http://{target}"),
            TransportSecurity::InsecureTls => format!("http://{endpoint}"),
        };
        let builder = Endpoint::from_shared(uri)
            .map_err(transport_err)?
            .connect_timeout(Duration::from_secs(self.config.connect_timeout))
            .tcp_nodelay(true);

        match security {
            TransportSecurity::Plaintext => builder.connect().await.map_err(transport_err),
            TransportSecurity::InsecureTls => {
                let tls = TlsConnector::from(Arc::new(insecure_client_config()?));
                let server_name = ServerName::try_from(endpoint.hostname.clone())
                    .map_err(|_| BenchError::InvalidServerName(endpoint.hostname.clone()))?;

                let connector = tower::service_fn(move |_: Uri| {
                    let tls = tls.clone();
                    let server_name = server_name.clone();
                    async move {
                        let tcp = TcpStream::connect(target).await?;
                        tcp.set_nodelay(true)?;
                        let stream = tls.connect(server_name, tcp).await?;
                        Ok::<_, std::io::Error>(TokioIo::new(stream))
                    }
                });
                builder.connect_with_connector(connector).await.map_err(transport_err)
            }
        }
    }
}

/// First IPv4 address of `hostname`
pub async fn resolve_ipv4(hostname: &str, port: u16) -> BenchResult<Ipv4Addr> {
    let resolve_err =
        |source| BenchError::Resolve { host: hostname.to_string(), source };

    let addrs = tokio::net::lookup_host((hostname, port))
        .await
        .map_err(|e| resolve_err(Some(e)))?;
    addrs
        .filter_map(|addr| match addr {
            SocketAddr::V4(v4) => Some(*v4.ip()),
            SocketAddr::V6(_) => None,
        })
        .next()
        .ok_or_else(|| resolve_err(None))
}

/// Answers every server ping on the request side of the subscription.
/// All updates, pings included, are still yielded.
pub struct PingResponder<S> {
    label: String,
    inner: S,
    request_tx: mpsc::UnboundedSender<SubscribeRequest>,
}

impl<S> PingResponder<S> {
    pub fn new(
        label: impl Into<String>,
        inner: S,
        request_tx: mpsc::UnboundedSender<SubscribeRequest>,
    ) -> Self {
        Self { label: label.into(), inner, request_tx }
    }
}

impl<S> Stream for PingResponder<S>
where
    S: Stream<Item = Result<SubscribeUpdate, Status>> + Unpin,
{
    type Item = Result<SubscribeUpdate, Status>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let polled = Pin::new(&mut self.inner).poll_next(cx);
        if let Poll::Ready(Some(Ok(update))) = &polled {
            if matches!(update.update_oneof, Some(UpdateOneof::Ping(_)))
                && self.request_tx.unbounded_send(ping_request()).is_err()
            {
                warn!("Request side of {} is closed, ping not answered", self.label);
            }
        }
        polled
    }
}

/// Live subscription: the update stream plus the open request side
pub struct ConnectedStream {
    endpoint: ProviderEndpoint,
    updates: PingResponder<Streaming<SubscribeUpdate>>,
    // keeps the channel alive for the lifetime of the subscription
    _client: GeyserClient<InterceptedService<Channel, XTokenInterceptor>>,
}

impl ConnectedStream {
    pub fn endpoint(&self) -> &ProviderEndpoint {
        &self.endpoint
    }
}

impl Stream for ConnectedStream {
    type Item = Result<SubscribeUpdate, Status>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.updates).poll_next(cx)
    }
}
