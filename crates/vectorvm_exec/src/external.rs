//! Native functions callable from bytecode.
//!
//! Functions are registered by name in a [`FunctionRegistry`] and resolved once,
//! when a program is loaded, into a [`FunctionTable`] whose slot order matches
//! the `u16` indices baked into `external_func_call` instructions. A name that
//! does not resolve leaves its slot unbound; calling it fails the chunk.
//!
//! A call runs once per chunk. The VM gathers every input operand for the whole
//! chunk, hands them to the callback through an [`ExternalCall`], and scatters
//! the outputs back to the destination registers afterwards.

#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use rand_chacha::ChaCha8Rng;
use tracing::warn;
use vectorvm_foundation::{Error, ErrorKind, Result, bits_to_bool, bool_to_bits};

/// Set on an `external_func_call` input operand that addresses the constant
/// table; the low 15 bits are the byte offset.
pub const CALL_CONSTANT_FLAG: u16 = 0x8000;

/// Opaque per-binding state handed untouched to callbacks.
pub type UserData = Arc<dyn Any + Send + Sync>;

/// Callback signature of a native function.
pub type NativeFn = Arc<dyn Fn(&mut ExternalCall<'_>) -> Result<()> + Send + Sync>;

/// A named native function with a fixed operand shape.
///
/// The VM does not interpret what a callback computes. Returning `Err` aborts
/// the chunk and is meant for accessor errors, such as an input or output
/// index outside the call. A failure in the function's own domain should
/// write sentinel outputs and return `Ok`, leaving the program to test them.
#[derive(Clone)]
pub struct ExternalFunction {
    /// Binding name.
    pub name: String,
    /// Number of input operands.
    pub num_inputs: u16,
    /// Number of output registers.
    pub num_outputs: u16,
    /// Whether the instruction carries a user-pointer index.
    pub needs_user_ptr: bool,
    func: NativeFn,
}

impl ExternalFunction {
    /// Creates a binding.
    pub fn new<F>(name: impl Into<String>, num_inputs: u16, num_outputs: u16, func: F) -> Self
    where
        F: Fn(&mut ExternalCall<'_>) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            num_inputs,
            num_outputs,
            needs_user_ptr: false,
            func: Arc::new(func),
        }
    }

    /// Marks the binding as taking a user pointer.
    #[must_use]
    pub fn with_user_ptr(mut self) -> Self {
        self.needs_user_ptr = true;
        self
    }

    /// Runs the callback.
    pub fn call(&self, call: &mut ExternalCall<'_>) -> Result<()> {
        (self.func)(call)
    }
}

impl fmt::Debug for ExternalFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternalFunction")
            .field("name", &self.name)
            .field("num_inputs", &self.num_inputs)
            .field("num_outputs", &self.num_outputs)
            .field("needs_user_ptr", &self.needs_user_ptr)
            .finish_non_exhaustive()
    }
}

/// Functions indexed by the slot baked into bytecode.
#[derive(Clone, Debug, Default)]
pub struct FunctionTable {
    slots: Vec<Option<ExternalFunction>>,
}

impl FunctionTable {
    /// Creates an empty table.
    #[must_use]
    pub const fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Appends a bound slot, returning its index.
    pub fn push(&mut self, function: ExternalFunction) -> u16 {
        self.slots.push(Some(function));
        (self.slots.len() - 1) as u16
    }

    /// Appends an unbound slot, returning its index.
    pub fn push_unbound(&mut self) -> u16 {
        self.slots.push(None);
        (self.slots.len() - 1) as u16
    }

    /// Returns the function bound to `slot`.
    pub fn get(&self, slot: u16) -> Result<&ExternalFunction> {
        self.slots
            .get(usize::from(slot))
            .and_then(Option::as_ref)
            .ok_or_else(|| Error::new(ErrorKind::UnboundExternalFunction(slot)))
    }

    /// Returns the number of slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if the table has no slots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Returns the number of unbound slots.
    #[must_use]
    pub fn num_unbound(&self) -> usize {
        self.slots.iter().filter(|s| s.is_none()).count()
    }
}

/// Named native functions available to programs.
#[derive(Clone, Debug, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, ExternalFunction>,
}

impl FunctionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a function, replacing any earlier one with the same name.
    pub fn register(&mut self, function: ExternalFunction) {
        self.functions.insert(function.name.clone(), function);
    }

    /// Returns a registered function by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ExternalFunction> {
        self.functions.get(name)
    }

    /// Returns the number of registered functions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Builds the table for a program's binding list, in order.
    ///
    /// Names that are not registered become unbound slots.
    pub fn resolve<S: AsRef<str>>(&self, names: &[S]) -> FunctionTable {
        let mut table = FunctionTable::new();
        for name in names {
            let name = name.as_ref();
            match self.functions.get(name) {
                Some(function) => {
                    table.push(function.clone());
                }
                None => {
                    let slot = table.push_unbound();
                    warn!(function = name, slot, "unresolved external function");
                }
            }
        }
        table
    }
}

/// One invocation of a native function over a chunk.
pub struct ExternalCall<'c> {
    inputs: &'c [Vec<u32>],
    outputs: &'c mut [Vec<u32>],
    user_data: Option<&'c UserData>,
    rng: &'c mut ChaCha8Rng,
    start_instance: usize,
    num_instances: usize,
}

impl<'c> ExternalCall<'c> {
    /// Creates a call over gathered inputs and zeroed outputs.
    pub fn new(
        inputs: &'c [Vec<u32>],
        outputs: &'c mut [Vec<u32>],
        user_data: Option<&'c UserData>,
        rng: &'c mut ChaCha8Rng,
        start_instance: usize,
        num_instances: usize,
    ) -> Self {
        Self {
            inputs,
            outputs,
            user_data,
            rng,
            start_instance,
            num_instances,
        }
    }

    /// Returns the number of instances in the chunk.
    #[must_use]
    pub fn num_instances(&self) -> usize {
        self.num_instances
    }

    /// Returns the absolute index of the chunk's first instance.
    #[must_use]
    pub fn start_instance(&self) -> usize {
        self.start_instance
    }

    /// Returns the number of input operands.
    #[must_use]
    pub fn num_inputs(&self) -> usize {
        self.inputs.len()
    }

    /// Returns the number of output registers.
    #[must_use]
    pub fn num_outputs(&self) -> usize {
        self.outputs.len()
    }

    /// Reads the raw bits of one input for one instance.
    pub fn input(&self, input: usize, instance: usize) -> Result<u32> {
        let column = self
            .inputs
            .get(input)
            .ok_or_else(|| Error::instance_out_of_bounds(input, self.inputs.len()))?;
        column
            .get(instance)
            .copied()
            .ok_or_else(|| Error::instance_out_of_bounds(instance, column.len()))
    }

    /// Reads one input as a float.
    pub fn input_f32(&self, input: usize, instance: usize) -> Result<f32> {
        self.input(input, instance).map(f32::from_bits)
    }

    /// Reads one input as an integer.
    pub fn input_i32(&self, input: usize, instance: usize) -> Result<i32> {
        self.input(input, instance).map(|bits| bits as i32)
    }

    /// Reads one input as a boolean.
    pub fn input_bool(&self, input: usize, instance: usize) -> Result<bool> {
        self.input(input, instance).map(bits_to_bool)
    }

    /// Writes the raw bits of one output for one instance.
    pub fn set_output(&mut self, output: usize, instance: usize, bits: u32) -> Result<()> {
        let count = self.outputs.len();
        let column = self
            .outputs
            .get_mut(output)
            .ok_or_else(|| Error::instance_out_of_bounds(output, count))?;
        let length = column.len();
        *column
            .get_mut(instance)
            .ok_or_else(|| Error::instance_out_of_bounds(instance, length))? = bits;
        Ok(())
    }

    /// Writes one output as a float.
    pub fn set_output_f32(&mut self, output: usize, instance: usize, value: f32) -> Result<()> {
        self.set_output(output, instance, value.to_bits())
    }

    /// Writes one output as an integer.
    pub fn set_output_i32(&mut self, output: usize, instance: usize, value: i32) -> Result<()> {
        self.set_output(output, instance, value as u32)
    }

    /// Writes one output as a boolean mask.
    pub fn set_output_bool(&mut self, output: usize, instance: usize, value: bool) -> Result<()> {
        self.set_output(output, instance, bool_to_bits(value))
    }

    /// Returns the user pointer downcast to `T`, if bound and of that type.
    #[must_use]
    pub fn user_data<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.user_data.and_then(|data| data.downcast_ref::<T>())
    }

    /// Returns the call's random stream.
    pub fn rng(&mut self) -> &mut ChaCha8Rng {
        self.rng
    }
}
