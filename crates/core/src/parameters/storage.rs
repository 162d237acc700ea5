//! Parameter Storage Types
//!
//! Provides core parameter types and the `ParameterStore` the commander and
//! navigator blocks are loaded from. Persistence is an external concern.

use bitflags::bitflags;
use heapless::index_map::FnvIndexMap;
use heapless::String;

/// Maximum parameter name length
pub const PARAM_NAME_LEN: usize = 16;

/// Maximum number of parameters
pub const MAX_PARAMS: usize = 64;

/// Maximum string parameter length
pub const MAX_STRING_LEN: usize = 63;

bitflags! {
    /// Parameter flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ParamFlags: u8 {
        /// Parameter is hidden from PARAM_REQUEST_READ/LIST
        const HIDDEN = 0b00000001;
        /// Parameter is read-only (cannot be modified over the link)
        const READ_ONLY = 0b00000010;
    }
}

/// Parameter value types
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// String parameter (max 63 chars)
    String(String<MAX_STRING_LEN>),
    /// Boolean parameter
    Bool(bool),
    /// 32-bit signed integer
    Int(i32),
    /// 32-bit floating point
    Float(f32),
}

/// Why a parameter could not be registered or changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterError {
    /// Parameter was never registered
    Unknown,
    /// Name exceeds `PARAM_NAME_LEN`
    NameTooLong,
    /// Store is full
    StoreFull,
    /// Read-only parameter cannot be modified
    ReadOnly,
    /// Value type differs from the registered one
    TypeMismatch,
}

impl core::fmt::Display for ParameterError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ParameterError::Unknown => write!(f, "unknown parameter"),
            ParameterError::NameTooLong => write!(f, "parameter name too long"),
            ParameterError::StoreFull => write!(f, "parameter store full"),
            ParameterError::ReadOnly => write!(f, "parameter is read-only"),
            ParameterError::TypeMismatch => write!(f, "parameter type mismatch"),
        }
    }
}

impl ParamValue {
    /// Convert `self` to the type of `registered`. Integers widen to
    /// floats, since a ground station may send whole numbers either way.
    fn coerce_to(self, registered: &ParamValue) -> Result<ParamValue, ParameterError> {
        match (registered, self) {
            (ParamValue::Float(_), ParamValue::Int(v)) => Ok(ParamValue::Float(v as f32)),
            (ParamValue::String(_), v @ ParamValue::String(_))
            | (ParamValue::Bool(_), v @ ParamValue::Bool(_))
            | (ParamValue::Int(_), v @ ParamValue::Int(_))
            | (ParamValue::Float(_), v @ ParamValue::Float(_)) => Ok(v),
            _ => Err(ParameterError::TypeMismatch),
        }
    }
}

/// Parameter metadata
#[derive(Debug, Clone)]
pub struct ParamMetadata {
    /// Parameter flags
    pub flags: ParamFlags,
}

/// Parameter store for configuration management
///
/// Stores parameters as key-value pairs with metadata (flags). Every
/// successful `set` bumps a generation counter so consumers can detect
/// updates without holding a reference across cycles.
#[derive(Debug)]
pub struct ParameterStore {
    parameters: FnvIndexMap<String<PARAM_NAME_LEN>, ParamValue, MAX_PARAMS>,
    metadata: FnvIndexMap<String<PARAM_NAME_LEN>, ParamMetadata, MAX_PARAMS>,
    generation: u32,
}

impl ParameterStore {
    /// Create a new empty parameter store
    pub fn new() -> Self {
        Self {
            parameters: FnvIndexMap::new(),
            metadata: FnvIndexMap::new(),
            generation: 0,
        }
    }

    fn key(name: &str) -> Result<String<PARAM_NAME_LEN>, ParameterError> {
        let mut key = String::<PARAM_NAME_LEN>::new();
        key.push_str(name).map_err(|_| ParameterError::NameTooLong)?;
        Ok(key)
    }

    /// Get parameter value
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        let key = Self::key(name).ok()?;
        self.parameters.get(&key)
    }

    /// Set parameter value, keeping the registered type
    pub fn set(&mut self, name: &str, value: ParamValue) -> Result<(), ParameterError> {
        let key = Self::key(name)?;

        let value = match self.parameters.get(&key) {
            Some(registered) => value.coerce_to(registered)?,
            None => return Err(ParameterError::Unknown),
        };

        if let Some(meta) = self.metadata.get(&key) {
            if meta.flags.contains(ParamFlags::READ_ONLY) {
                return Err(ParameterError::ReadOnly);
            }
        }

        self.parameters
            .insert(key, value)
            .map_err(|_| ParameterError::StoreFull)?;
        self.generation = self.generation.wrapping_add(1);
        Ok(())
    }

    /// Register a new parameter with default value and flags
    ///
    /// If the parameter already exists, this is a no-op (idempotent).
    pub fn register(
        &mut self,
        name: &str,
        default_value: ParamValue,
        flags: ParamFlags,
    ) -> Result<(), ParameterError> {
        let key = Self::key(name)?;

        if self.parameters.contains_key(&key) {
            return Ok(());
        }

        self.parameters
            .insert(key.clone(), default_value)
            .map_err(|_| ParameterError::StoreFull)?;
        self.metadata
            .insert(key, ParamMetadata { flags })
            .map_err(|_| ParameterError::StoreFull)?;
        Ok(())
    }

    /// Read a numeric parameter as `f32`, falling back to `default`
    pub fn float_or(&self, name: &str, default: f32) -> f32 {
        match self.get(name) {
            Some(ParamValue::Float(v)) => *v,
            Some(ParamValue::Int(v)) => *v as f32,
            Some(ParamValue::Bool(v)) => *v as u8 as f32,
            _ => default,
        }
    }

    /// Read a numeric parameter as `i32`, falling back to `default`
    pub fn int_or(&self, name: &str, default: i32) -> i32 {
        match self.get(name) {
            Some(ParamValue::Int(v)) => *v,
            Some(ParamValue::Float(v)) => *v as i32,
            Some(ParamValue::Bool(v)) => *v as i32,
            _ => default,
        }
    }

    /// Read a parameter as a flag (non-zero is `true`)
    pub fn bool_or(&self, name: &str, default: bool) -> bool {
        match self.get(name) {
            Some(ParamValue::Bool(v)) => *v,
            Some(ParamValue::Int(v)) => *v != 0,
            Some(ParamValue::Float(v)) => *v != 0.0,
            _ => default,
        }
    }

    /// Check if parameter is hidden
    pub fn is_hidden(&self, name: &str) -> bool {
        let Ok(key) = Self::key(name) else {
            return false;
        };
        self.metadata
            .get(&key)
            .map(|meta| meta.flags.contains(ParamFlags::HIDDEN))
            .unwrap_or(false)
    }

    /// Get all parameter names (excluding hidden parameters)
    pub fn iter_names(&self) -> impl Iterator<Item = &String<PARAM_NAME_LEN>> {
        self.parameters
            .keys()
            .filter(|name| !self.is_hidden(name.as_str()))
    }

    /// Get parameter count (excluding hidden parameters)
    pub fn count(&self) -> usize {
        self.iter_names().count()
    }

    /// Monotonic counter bumped on every successful `set`
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Get total parameter count (including hidden parameters)
    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }
}

impl Default for ParameterStore {
    fn default() -> Self {
        Self::new()
    }
}
