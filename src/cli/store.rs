use ccn::publish::error::PublishError;
use ccn::store::tcp::TcpRepository;

/// Open the repository connection. Nothing is sent until the first fetch.
#[tracing::instrument(err)]
pub(super) async fn connect(addr: &str) -> Result<TcpRepository, PublishError> {
    let repo = TcpRepository::connect(addr).await?;
    tracing::debug!(message = "Connected to repository", addr);
    Ok(repo)
}
