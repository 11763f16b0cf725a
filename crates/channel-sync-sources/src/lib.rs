pub mod traits;
pub mod factory;
pub mod ytdlp;
pub mod youtube;
pub mod error;

pub use traits::{DownloadRequest, MetadataService, VideoPlatform};
pub use factory::{SourceFactory, resolve_data_api_key, select_data_api_key};
pub use error::{SourceError, is_auth_block_message, is_challenge_format_message};
pub use ytdlp::{CookieSource, YtDlpPlatform, normalize_channel_url};
pub use youtube::YouTubeDataApi;
