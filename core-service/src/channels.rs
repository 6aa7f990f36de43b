//! Host channel and method names.

use serde::Deserialize;

/// Method channel answering `getNetworkType`
pub const NETWORK_CHANNEL: &str = "com.rabee.omran.network";
/// Event channel streaming network type changes
pub const NETWORK_EVENTS_CHANNEL: &str = "com.rabee.omran.network/events";
/// Method channel answering `saveImageToGallery`
pub const GALLERY_CHANNEL: &str = "com.rabee.omran.gallery";

pub const GET_NETWORK_TYPE: &str = "getNetworkType";
pub const SAVE_IMAGE_TO_GALLERY: &str = "saveImageToGallery";

/// Deferred task name for background saves
pub const SAVE_IMAGE_TASK: &str = "background_image_worker";

/// Input keys of a deferred save
pub const INPUT_URL: &str = "url";
pub const INPUT_FILE_NAME: &str = "fileName";

/// Arguments of `saveImageToGallery`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SaveImageArgs {
    pub url: Option<String>,
    pub file_name: Option<String>,
}

impl SaveImageArgs {
    /// Lenient parse: anything that is not an object with string fields
    /// yields empty arguments.
    pub fn from_value(args: serde_json::Value) -> Self {
        serde_json::from_value(args).unwrap_or_default()
    }
}
