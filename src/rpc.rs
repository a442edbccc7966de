//! The wire surface binding workers to the coordinator.
//!
//! Message and service shapes live in `proto/mapreduce.proto` and are
//! compiled by `tonic-build`. Transport is a unix-domain socket: the
//! deployment is host-local, so there is no address to configure and no
//! authentication.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::net::UnixStream;
use tonic::transport::{Channel, Endpoint, Uri};
use tower::service_fn;

pub mod mapreduce {
    tonic::include_proto!("mapreduce");
}

use mapreduce::coordinator_client::CoordinatorClient;

/// A connected worker-side client.
pub type Client = CoordinatorClient<Channel>;

/// Default socket path for this user.
///
/// The name carries the invoking uid so concurrent users of a shared host
/// do not collide on the endpoint.
pub fn endpoint_path() -> PathBuf {
    let uid = unsafe { libc::getuid() };
    PathBuf::from(format!("/var/tmp/mmr-{uid}"))
}

/// Connect to the coordinator listening on `socket`.
pub async fn connect(socket: &Path) -> Result<Client> {
    let path = socket.to_path_buf();
    // The URI is required by the endpoint builder but never resolved;
    // every connection goes through the unix-domain connector below.
    let channel = Endpoint::try_from("http://[::]:50051")?
        .connect_with_connector(service_fn(move |_: Uri| UnixStream::connect(path.clone())))
        .await
        .with_context(|| format!("dialing coordinator at {}", socket.display()))?;
    Ok(CoordinatorClient::new(channel))
}
