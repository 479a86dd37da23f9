//! Source controller
//!
//! Owns the analog/digital selection of each source input.

use preamp_regs::{DeviceRegisters, DeviceWrite, InputType, SOURCE_COUNT};
use tracing::{debug, info, warn};

use crate::error::{check_source, PreampError};

/// Per-source input type
#[derive(Debug, Clone)]
pub struct SourceController {
    sources: [InputType; SOURCE_COUNT],
    default_input: InputType,
}

impl SourceController {
    /// Create a controller with every source at `default_input`
    pub fn new(default_input: InputType) -> Self {
        Self {
            sources: [default_input; SOURCE_COUNT],
            default_input,
        }
    }

    /// Reset every source to the default input type and write it out
    pub fn init_sources<D: DeviceRegisters>(&mut self, dev: &mut D) -> Result<(), PreampError> {
        self.sources = [self.default_input; SOURCE_COUNT];
        for source in 0..SOURCE_COUNT {
            dev.write(DeviceWrite::InputType {
                source,
                input_type: self.default_input,
            })?;
        }
        info!(
            "Initialized {} sources ({})",
            SOURCE_COUNT, self.default_input
        );
        Ok(())
    }

    /// Select the input type of a source
    pub fn set_source_ad<D: DeviceRegisters>(
        &mut self,
        dev: &mut D,
        src: usize,
        input_type: InputType,
    ) -> Result<(), PreampError> {
        if let Err(e) = check_source(src) {
            warn!("Rejected input change: {}", e);
            return Err(e);
        }

        dev.write(DeviceWrite::InputType {
            source: src,
            input_type,
        })?;
        self.sources[src] = input_type;
        debug!("Source {} input set to {}", src, input_type);
        Ok(())
    }

    /// Input type of a source
    pub fn get_source_ad(&self, src: usize) -> Result<InputType, PreampError> {
        self.sources
            .get(src)
            .copied()
            .ok_or(PreampError::SourceOutOfRange { src })
    }

    /// Input type of every source
    pub fn sources(&self) -> &[InputType; SOURCE_COUNT] {
        &self.sources
    }
}

impl Default for SourceController {
    fn default() -> Self {
        Self::new(InputType::Analog)
    }
}
