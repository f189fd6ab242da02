mod std_err {
    pub type Error = Box<dyn std::error::Error + Send + Sync>;

    pub trait ErrorKind {
        fn kind<E: std::error::Error + PartialEq + 'static>(&self) -> Option<&E>;
    }

    impl ErrorKind for Error {
        #[inline]
        fn kind<E: std::error::Error + PartialEq + 'static>(&self) -> Option<&E> {
            self.downcast_ref::<E>()
        }
    }

    impl std::error::Error for crate::LayerError {}
}

pub use std_err::{Error, ErrorKind};

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum LayerError {
    KernelNotFound,
    PipelineNotReady,
    DimensionOverflow,
    InvalidDeviceIdx,
    NoSuitableMemoryType,
    MissingBinding,
    OutOfBounds,
    InvalidElementSize,
    ElementSizeMismatch,
    MisalignedOffset,
}

impl LayerError {
    pub fn as_str(&self) -> &'static str {
        match self {
            LayerError::KernelNotFound => {
                "The kernel library does not contain a kernel with this name."
            }
            LayerError::PipelineNotReady => {
                "The layer was encoded before its pipeline was set up in a kernel library."
            }
            LayerError::DimensionOverflow => "A batch or input size does not fit into 32 bits.",
            LayerError::InvalidDeviceIdx => "No compute device exists at the selected index.",
            LayerError::NoSuitableMemoryType => {
                "The device does not offer a host visible memory type for this buffer."
            }
            LayerError::MissingBinding => "A dispatch was issued with a kernel slot left unbound.",
            LayerError::OutOfBounds => "A kernel accessed memory outside of a bound buffer.",
            LayerError::InvalidElementSize => "The element size of a layer must not be zero.",
            LayerError::ElementSizeMismatch => {
                "The kernel moves elements of a different width than the layer was created with."
            }
            LayerError::MisalignedOffset => {
                "A binding offset is misaligned for the device and the kernel takes no remainder."
            }
        }
    }
}

impl core::fmt::Debug for LayerError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl core::fmt::Display for LayerError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{self:?}")
    }
}
