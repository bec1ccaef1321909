//! Raster buffer store
//!
//! Named arena of in-memory raster buffers and their profiles, the unit of
//! data interchange between pipeline stages. A stage reads the buffers of
//! the previous stage through shared views and takes ownership of a buffer
//! only when it consumes it, so completed stage outputs stay immutable.

use crate::types::{DsmBuffer, DsmError, DsmResult, MaskBuffer, RasterProfile};
use ndarray::ArrayView2;
use std::collections::HashMap;

/// An owned raster buffer together with its metadata profile
#[derive(Debug, Clone)]
pub enum RasterBuffer {
    Float {
        data: DsmBuffer,
        profile: RasterProfile,
    },
    Byte {
        data: MaskBuffer,
        profile: RasterProfile,
    },
}

impl RasterBuffer {
    pub fn profile(&self) -> &RasterProfile {
        match self {
            RasterBuffer::Float { profile, .. } => profile,
            RasterBuffer::Byte { profile, .. } => profile,
        }
    }
}

/// Store of named raster buffers
#[derive(Debug, Default)]
pub struct RasterStore {
    buffers: HashMap<String, RasterBuffer>,
}

impl RasterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_float(&mut self, key: &str, data: DsmBuffer, profile: RasterProfile) {
        self.buffers
            .insert(key.to_string(), RasterBuffer::Float { data, profile });
    }

    pub fn insert_byte(&mut self, key: &str, data: MaskBuffer, profile: RasterProfile) {
        self.buffers
            .insert(key.to_string(), RasterBuffer::Byte { data, profile });
    }

    pub fn contains(&self, key: &str) -> bool {
        self.buffers.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    pub fn profile(&self, key: &str) -> DsmResult<&RasterProfile> {
        Ok(self.get(key)?.profile())
    }

    /// Shared read view of a float buffer
    pub fn float_view(&self, key: &str) -> DsmResult<ArrayView2<'_, f32>> {
        match self.get(key)? {
            RasterBuffer::Float { data, .. } => Ok(data.view()),
            RasterBuffer::Byte { .. } => Err(Self::type_mismatch(key, "float")),
        }
    }

    /// Shared read view of a byte buffer
    pub fn byte_view(&self, key: &str) -> DsmResult<ArrayView2<'_, u8>> {
        match self.get(key)? {
            RasterBuffer::Byte { data, .. } => Ok(data.view()),
            RasterBuffer::Float { .. } => Err(Self::type_mismatch(key, "byte")),
        }
    }

    /// Take ownership of a float buffer, removing it from the store
    pub fn take_float(&mut self, key: &str) -> DsmResult<(DsmBuffer, RasterProfile)> {
        match self.remove(key)? {
            RasterBuffer::Float { data, profile } => Ok((data, profile)),
            buffer @ RasterBuffer::Byte { .. } => {
                self.buffers.insert(key.to_string(), buffer);
                Err(Self::type_mismatch(key, "float"))
            }
        }
    }

    /// Take ownership of a byte buffer, removing it from the store
    pub fn take_byte(&mut self, key: &str) -> DsmResult<(MaskBuffer, RasterProfile)> {
        match self.remove(key)? {
            RasterBuffer::Byte { data, profile } => Ok((data, profile)),
            buffer @ RasterBuffer::Float { .. } => {
                self.buffers.insert(key.to_string(), buffer);
                Err(Self::type_mismatch(key, "byte"))
            }
        }
    }

    fn get(&self, key: &str) -> DsmResult<&RasterBuffer> {
        self.buffers
            .get(key)
            .ok_or_else(|| DsmError::Processing(format!("Unknown raster buffer '{}'", key)))
    }

    fn remove(&mut self, key: &str) -> DsmResult<RasterBuffer> {
        self.buffers
            .remove(key)
            .ok_or_else(|| DsmError::Processing(format!("Unknown raster buffer '{}'", key)))
    }

    fn type_mismatch(key: &str, expected: &str) -> DsmError {
        DsmError::Processing(format!("Raster buffer '{}' is not a {} buffer", key, expected))
    }
}
