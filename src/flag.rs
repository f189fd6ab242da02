/// Describes how a device buffer is backed on the host side.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Default)]
pub enum StorageMode {
    /// Host and device both read and write the memory.
    #[default]
    Shared,
    /// The host only writes, the device only reads. Used for small transient uploads.
    WriteCombined,
}
