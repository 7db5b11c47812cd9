//! Shared-library plug-in modules
//!
//! A library exports `publish_register`, a Rust-ABI function receiving the
//! [`PluginRegistrar`] for its module. The library must be built against the same
//! `publish-core` and compiler as the host. Loaded libraries stay resident for the
//! life of the loader so their factories remain valid.

use super::loader::{ModuleLoader, PluginRegistrar};
use crate::error::ModuleError;
use libloading::{Library, Symbol};
use parking_lot::Mutex;
use std::path::Path;

/// Symbol every plug-in library exports
pub const REGISTER_SYMBOL: &[u8] = b"publish_register";

/// Signature of the exported registration function
pub type RegisterFn = unsafe extern "Rust" fn(&mut PluginRegistrar<'_>);

#[derive(Default)]
pub struct DylibLoader {
    libraries: Mutex<Vec<Library>>,
}

impl DylibLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn loaded(&self) -> usize {
        self.libraries.lock().len()
    }
}

impl ModuleLoader for DylibLoader {
    fn extensions(&self) -> &[&'static str] {
        &["so", "dylib", "dll"]
    }

    /// `libvalidate_mesh.so` is module `validate_mesh`.
    fn module_name(&self, path: &Path) -> Option<String> {
        let stem = path.file_stem()?.to_string_lossy().into_owned();
        Some(stem.strip_prefix("lib").map(str::to_string).unwrap_or(stem))
    }

    fn load(&self, path: &Path, registrar: &mut PluginRegistrar<'_>) -> Result<(), ModuleError> {
        // SAFETY: loading runs the library's initializers; plug-in libraries are
        // trusted code on a registered plug-in path.
        let library = unsafe { Library::new(path) }.map_err(|e| ModuleError::Library(e.to_string()))?;

        {
            // SAFETY: the exported symbol must have the `RegisterFn` signature.
            let register: Symbol<RegisterFn> = unsafe { library.get(REGISTER_SYMBOL) }
                .map_err(|e| ModuleError::Library(e.to_string()))?;
            unsafe { register(registrar) };
        }

        self.libraries.lock().push(library);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::Category;
    use crate::registry::loader::{load_module, Factories};
    use tempfile::TempDir;

    #[test]
    fn test_module_name_strips_lib_prefix() {
        let loader = DylibLoader::new();
        assert_eq!(
            loader.module_name(Path::new("/plugins/libvalidate_mesh.so")).as_deref(),
            Some("validate_mesh")
        );
        assert_eq!(
            loader.module_name(Path::new("C:/plugins/extract_cache.dll")).as_deref(),
            Some("extract_cache")
        );
    }

    #[test]
    fn test_invalid_library_is_module_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("libcollect_broken.so");
        std::fs::write(&path, b"not a library").unwrap();

        let loader = DylibLoader::new();
        let err = load_module(&loader, &path, Category::Collector, &Factories::default()).unwrap_err();
        assert!(matches!(err, ModuleError::Library(_)));
        assert_eq!(loader.loaded(), 0);
    }
}
