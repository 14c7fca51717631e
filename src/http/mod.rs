//! Backend HTTP plumbing
//!
//! `transport` defines the seam, `client` the reqwest implementation and
//! `endpoints` the backend routes the core consumes.

pub mod client;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use client::ReqwestTransport;
pub use transport::{call_bytes, call_json, FormPart, HttpReply, HttpRequest, Method, RequestBody, Transport};

/// Backend routes, relative to the API base
pub mod endpoints {
    pub const DETECT_DOCUMENT: &str = "detectfiles";
    pub const DETECT_IMAGE: &str = "upload";
    pub const MASK_IMAGE: &str = "mask";
    pub const MASK_DOCUMENT: &str = "maskfiles";
    pub const ENCRYPT_IMAGE: &str = "encrypt";
    pub const ENCRYPT_DOCUMENT: &str = "encryptfiles";
    pub const DECRYPT_IMAGE: &str = "decrypt";
    pub const DECRYPT_DOCUMENT: &str = "decryptfiles";
    pub const SAVE_SAFE_FILE: &str = "auth/save_safe_file";
    pub const UPLOAD_SINGLE: &str = "auth/upload_single_to_drive";
    pub const DRIVE_LISTING: &str = "auth/drive";

    pub fn image_key(folder: &str) -> String {
        format!("data_storage_keys/{}_key.key", folder)
    }

    pub fn upload_folder(folder: &str) -> String {
        format!("auth/upload_folder_to_drive/{}", folder)
    }

    pub fn stored_file(folder: &str, name: &str) -> String {
        format!("data_storage/{}/{}", folder, name)
    }

    pub fn stored_metadata(folder: &str, name: &str) -> String {
        format!("data_storage/{}/{}_encrypted_data.json", folder, name)
    }

    pub fn drive_download(id: &str) -> String {
        format!("auth/download/{}", id)
    }

    pub fn drive_delete(id: &str) -> String {
        format!("auth/delete/{}", id)
    }

    /// Server-relative path returned by the backend (e.g. `data_storage/x/y.ctx`)
    pub fn server_path(path: &str) -> String {
        path.trim_start_matches('/').to_string()
    }
}
