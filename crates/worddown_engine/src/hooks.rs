/// Extension points fired once around each immediate pass and each background chunk.
pub trait ExportHooks: Send + Sync {
    fn before_export(&self) {}
    fn after_export(&self) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHooks;

impl ExportHooks for NoopHooks {}
