use dashmap::DashMap;

pub const UPLOAD_BUCKET: &str = "uploads";

/// Opaque blob store keyed by object name. Write-once per upload; the
/// storage mechanics behind it are not this pipeline's concern.
#[derive(Default)]
pub struct BlobStore {
    objects: DashMap<String, Vec<u8>>,
}

impl BlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, object_name: &str, bytes: Vec<u8>) {
        self.objects.insert(object_name.to_string(), bytes);
    }

    pub fn get(&self, object_name: &str) -> Option<Vec<u8>> {
        self.objects
            .get(object_name)
            .map(|entry| entry.value().clone())
    }
}

pub fn object_url(object_name: &str) -> String {
    format!("blob://{UPLOAD_BUCKET}/{object_name}")
}

pub fn object_name_from_url(url: &str) -> Option<&str> {
    url.strip_prefix("blob://")?
        .split_once('/')
        .map(|(_, object_name)| object_name)
}
