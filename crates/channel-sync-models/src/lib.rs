pub mod entry;
pub mod media_file;
pub mod publish_date;
pub mod status;
pub mod video_id;

pub use entry::{ChannelListing, VideoEntry, VideoMetadata};
pub use media_file::MediaFileName;
pub use publish_date::{date_from_timestamp, parse_published_at, parse_since_date, parse_upload_date};
pub use status::TaskStatus;
pub use video_id::{build_watch_url, video_id_from_url};
