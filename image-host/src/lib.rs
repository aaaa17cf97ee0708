pub mod imgur;

pub use imgur::{parse_upload_response, ImgurClient};

use dogecloud_core::{CoreError, HostedImage};
use std::path::Path;

/// Publishes a rendered image and hands back where it can be viewed.
pub trait ImageHost {
    async fn upload(&self, path: &Path) -> Result<HostedImage, CoreError>;
}
