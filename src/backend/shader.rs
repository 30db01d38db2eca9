// Shader module loading
//
// Vulkan consumes SPIR-V bytecode. The triangle's two stages are compiled
// ahead of time (see build.rs) and read from disk when the pipeline is built.

use ash::prelude::VkResult;
use ash::vk;
use std::io::Cursor;
use std::path::Path;

use crate::error::{Error, Result};

/// Read a SPIR-V binary into 32-bit words.
///
/// A missing file, or one whose length is not a whole number of words, is
/// `ShaderAssetMissing`.
pub fn load_spirv(path: &Path) -> Result<Vec<u32>> {
    let missing = |source| Error::ShaderAssetMissing {
        path: path.to_path_buf(),
        source,
    };

    let bytes = std::fs::read(path).map_err(missing)?;
    let words = ash::util::read_spv(&mut Cursor::new(bytes)).map_err(missing)?;

    log::debug!("Loaded shader {:?} ({} words)", path, words.len());
    Ok(words)
}

pub fn create_shader_module(device: &ash::Device, code: &[u32]) -> VkResult<vk::ShaderModule> {
    let create_info = vk::ShaderModuleCreateInfo::default().code(code);
    unsafe { device.create_shader_module(&create_info, None) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn scratch_file(name: &str, bytes: &[u8]) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "hello-triangle-{}-{}",
            std::process::id(),
            name
        ));
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn missing_file_is_shader_asset_missing() {
        let err = load_spirv(Path::new("shaders/nope.spv")).unwrap_err();
        match err {
            Error::ShaderAssetMissing { path, .. } => {
                assert_eq!(path, PathBuf::from("shaders/nope.spv"))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn reads_words_from_valid_binary() {
        // SPIR-V magic followed by one more word
        let mut bytes = 0x0723_0203u32.to_le_bytes().to_vec();
        bytes.extend_from_slice(&7u32.to_le_bytes());
        let path = scratch_file("valid.spv", &bytes);

        let words = load_spirv(&path).unwrap();
        assert_eq!(words, vec![0x0723_0203, 7]);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn truncated_binary_is_rejected() {
        let path = scratch_file("truncated.spv", &[0x03, 0x02, 0x23]);
        assert!(matches!(
            load_spirv(&path),
            Err(Error::ShaderAssetMissing { .. })
        ));
        std::fs::remove_file(path).ok();
    }
}
