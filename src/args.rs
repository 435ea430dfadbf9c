//! Argument tuples.
//!
//! Calls take their arguments as a tuple of up to eight [`ToJava`] values.
//! The tuple type fixes the argument part of the signature at compile time
//! (through [`ArgTypes`]) and marshals itself in declaration order.

use safejni_core::{ArgTypes, JValue};

use crate::error::Result;
use crate::marshal::{Marshaled, ToJava};
use crate::tracker::HandleTracker;

/// An argument tuple that can be marshaled for a call.
pub trait JavaArgs: ArgTypes {
    /// The marshaled values, one per argument.
    type Values: AsRef<[JValue]>;

    /// Marshal every argument, handing the references they create to `tracker`.
    fn marshal<'env>(&self, tracker: &mut HandleTracker<'env>) -> Result<Self::Values>;
}

fn track<'env>(tracker: &mut HandleTracker<'env>, marshaled: Marshaled<'env>) -> JValue {
    match marshaled {
        Marshaled::Value(value) => value,
        Marshaled::Local(local) => JValue::Object(Some(tracker.adopt(local))),
    }
}

macro_rules! count {
    () => { 0usize };
    ($head:ident $($tail:ident)*) => { 1usize + count!($($tail)*) };
}

macro_rules! impl_java_args {
    ($($name:ident),*) => {
        impl<$($name: ToJava),*> JavaArgs for ($($name,)*) {
            type Values = [JValue; count!($($name)*)];

            #[allow(non_snake_case, unused_variables)]
            fn marshal<'env>(&self, tracker: &mut HandleTracker<'env>) -> Result<Self::Values> {
                let env = tracker.env();
                let ($($name,)*) = self;
                Ok([$({
                    let marshaled = $name.to_java(env)?;
                    track(tracker, marshaled)
                }),*])
            }
        }
    };
}

impl_java_args!();
impl_java_args!(A);
impl_java_args!(A, B);
impl_java_args!(A, B, C);
impl_java_args!(A, B, C, D);
impl_java_args!(A, B, C, D, E);
impl_java_args!(A, B, C, D, E, F);
impl_java_args!(A, B, C, D, E, F, G);
impl_java_args!(A, B, C, D, E, F, G, H);
