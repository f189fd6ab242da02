use core::str::FromStr;

use naga::{
    back::spv::{Options, PipelineOptions},
    valid::ModuleInfo,
};

use super::TranslateError;

/// Entry point every WGSL kernel of this crate must declare.
pub const ENTRY_POINT: &str = "main";

/// How a global buffer variable of a kernel is bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    Storage { read_only: bool },
    Uniform,
}

/// A buffer binding of bind group 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderBinding {
    pub slot: u32,
    pub kind: BindingKind,
}

/// A WGSL compute kernel translated to SPIR-V, together with the layout
/// information the pipeline needs.
pub struct Spirv {
    words: Vec<u32>,
    workgroup_size: [u32; 3],
    bindings: Vec<ShaderBinding>,
    push_constant_size: u32,
    element_size: Option<u32>,
}

impl Spirv {
    pub fn from_wgsl(src: impl AsRef<str>) -> Result<Self, TranslateError> {
        let (module, info) = parse_and_validate_src(src.as_ref())?;
        let entry_point = module
            .entry_points
            .iter()
            .find(|ep| ep.stage == naga::ShaderStage::Compute && ep.name == ENTRY_POINT)
            .ok_or(TranslateError::MissingEntryPoint)?;
        let workgroup_size = entry_point.workgroup_size;
        let bindings = reflect_bindings(&module);
        let push_constant_size = reflect_push_constant_size(&module);
        let element_size = reflect_element_size(&module);
        let words = write_spirv(&module, &info)?;
        Ok(Spirv {
            words,
            workgroup_size,
            bindings,
            push_constant_size,
            element_size,
        })
    }

    #[inline]
    pub fn as_slice(&self) -> &[u32] {
        &self.words
    }

    #[inline]
    pub fn as_byte_slice(&self) -> &[u8] {
        bytemuck::cast_slice(&self.words)
    }

    /// The `@workgroup_size` of the entry point.
    #[inline]
    pub fn workgroup_size(&self) -> [u32; 3] {
        self.workgroup_size
    }

    /// Buffer bindings of group 0, ordered by slot.
    #[inline]
    pub fn bindings(&self) -> &[ShaderBinding] {
        &self.bindings
    }

    /// Size in bytes of the `var<push_constant>` block, 0 without one.
    ///
    /// A kernel that declares the block receives one `u32` per binding slot,
    /// word `n` holding the byte offset of slot `n` that could not be bound
    /// because of the device's offset alignment.
    #[inline]
    pub fn push_constant_size(&self) -> u32 {
        self.push_constant_size
    }

    /// Array stride of the buffer bound at slot 0.
    #[inline]
    pub fn element_size(&self) -> Option<u32> {
        self.element_size
    }
}

pub fn parse_and_validate_src(src: &str) -> Result<(naga::Module, ModuleInfo), TranslateError> {
    let mut frontend = naga::front::wgsl::Frontend::new();

    let module = frontend.parse(src).map_err(TranslateError::Frontend)?;

    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    );

    let info = validator
        .validate(&module)
        .map_err(TranslateError::Validate)?;
    Ok((module, info))
}

pub fn write_spirv(module: &naga::Module, info: &ModuleInfo) -> Result<Vec<u32>, TranslateError> {
    let mut words = Vec::new();

    let mut writer =
        naga::back::spv::Writer::new(&Options::default()).map_err(TranslateError::Backend)?;
    writer
        .write(
            module,
            info,
            Some(&PipelineOptions {
                shader_stage: naga::ShaderStage::Compute,
                entry_point: ENTRY_POINT.into(),
            }),
            &None,
            &mut words,
        )
        .map_err(TranslateError::Backend)?;

    Ok(words)
}

fn reflect_bindings(module: &naga::Module) -> Vec<ShaderBinding> {
    let mut bindings = module
        .global_variables
        .iter()
        .filter_map(|(_, var)| {
            let binding = var.binding.as_ref()?;
            if binding.group != 0 {
                return None;
            }
            let kind = match var.space {
                naga::AddressSpace::Uniform => BindingKind::Uniform,
                naga::AddressSpace::Storage { access } => BindingKind::Storage {
                    read_only: !access.contains(naga::StorageAccess::STORE),
                },
                _ => return None,
            };
            Some(ShaderBinding {
                slot: binding.binding,
                kind,
            })
        })
        .collect::<Vec<_>>();
    bindings.sort_by_key(|binding| binding.slot);
    bindings
}

fn reflect_push_constant_size(module: &naga::Module) -> u32 {
    module
        .global_variables
        .iter()
        .find(|(_, var)| var.space == naga::AddressSpace::PushConstant)
        .map(|(_, var)| module.types[var.ty].inner.size(module.to_ctx()))
        .unwrap_or(0)
}

fn reflect_element_size(module: &naga::Module) -> Option<u32> {
    module.global_variables.iter().find_map(|(_, var)| {
        let binding = var.binding.as_ref()?;
        if binding.group != 0 || binding.binding != 0 {
            return None;
        }
        match module.types[var.ty].inner {
            naga::TypeInner::Array { stride, .. } => Some(stride),
            _ => None,
        }
    })
}

impl FromStr for Spirv {
    type Err = TranslateError;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Spirv::from_wgsl(s)
    }
}
