//! Runtime set of enabled [WebAssembly proposals](https://github.com/WebAssembly/proposals).

// Copyright 2020 Google Inc. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

/// A bitset of enabled proposals.
///
/// Some proposals build on others; every mutation re-runs the dependency
/// closure, so e.g. enabling `gc` also enables `function_references`,
/// `reference_types` and `bulk_memory`. Disabling a feature does *not*
/// propagate to its dependents (and the closure may turn it straight back on
/// if a dependent is still enabled).
#[derive(Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Features {
    bits: u64,
}

macro_rules! features {
    ($(($const:ident, $enabled:ident, $enable:ident, $disable:ident, $set:ident, $bit:expr),)*) => {
        impl Features {
            $(pub const $const: u64 = 1 << $bit;)*

            $(
                pub fn $enabled(&self) -> bool {
                    self.bits & Self::$const != 0
                }

                pub fn $enable(&mut self) {
                    self.$set(true);
                }

                pub fn $disable(&mut self) {
                    self.$set(false);
                }

                pub fn $set(&mut self, value: bool) {
                    if value {
                        self.bits |= Self::$const;
                    } else {
                        self.bits &= !Self::$const;
                    }
                    self.update_dependencies();
                }
            )*
        }

        impl std::fmt::Debug for Features {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                let mut set = f.debug_set();
                $(
                    if self.$enabled() {
                        set.entry(&stringify!($const));
                    }
                )*
                set.finish()
            }
        }
    };
}

features! {
    (MUTABLE_GLOBALS, mutable_globals_enabled, enable_mutable_globals, disable_mutable_globals, set_mutable_globals_enabled, 0),
    (SATURATING_FLOAT_TO_INT, saturating_float_to_int_enabled, enable_saturating_float_to_int, disable_saturating_float_to_int, set_saturating_float_to_int_enabled, 1),
    (SIGN_EXTENSION, sign_extension_enabled, enable_sign_extension, disable_sign_extension, set_sign_extension_enabled, 2),
    (SIMD, simd_enabled, enable_simd, disable_simd, set_simd_enabled, 3),
    (THREADS, threads_enabled, enable_threads, disable_threads, set_threads_enabled, 4),
    (EXCEPTIONS, exceptions_enabled, enable_exceptions, disable_exceptions, set_exceptions_enabled, 5),
    (TAIL_CALL, tail_call_enabled, enable_tail_call, disable_tail_call, set_tail_call_enabled, 6),
    (BULK_MEMORY, bulk_memory_enabled, enable_bulk_memory, disable_bulk_memory, set_bulk_memory_enabled, 7),
    (REFERENCE_TYPES, reference_types_enabled, enable_reference_types, disable_reference_types, set_reference_types_enabled, 8),
    (FUNCTION_REFERENCES, function_references_enabled, enable_function_references, disable_function_references, set_function_references_enabled, 9),
    (MULTI_VALUE, multi_value_enabled, enable_multi_value, disable_multi_value, set_multi_value_enabled, 10),
    (MULTI_MEMORY, multi_memory_enabled, enable_multi_memory, disable_multi_memory, set_multi_memory_enabled, 11),
    (GC, gc_enabled, enable_gc, disable_gc, set_gc_enabled, 12),
    (MEMORY64, memory64_enabled, enable_memory64, disable_memory64, set_memory64_enabled, 13),
}

const ALL: u64 = (1 << 14) - 1;

impl Features {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_bits(bits: u64) -> Self {
        let mut features = Self { bits: bits & ALL };
        features.update_dependencies();
        features
    }

    pub fn enable_all(&mut self) {
        self.bits = ALL;
    }

    /// Returns whether every feature of `subset` is enabled in `self`.
    pub fn has_features(&self, subset: Features) -> bool {
        self.bits & subset.bits == subset.bits
    }

    fn update_dependencies(&mut self) {
        loop {
            let before = self.bits;
            if self.gc_enabled() {
                self.bits |= Self::REFERENCE_TYPES | Self::FUNCTION_REFERENCES;
            }
            if self.function_references_enabled() || self.exceptions_enabled() {
                self.bits |= Self::REFERENCE_TYPES;
            }
            if self.reference_types_enabled()
                || self.memory64_enabled()
                || self.multi_memory_enabled()
            {
                self.bits |= Self::BULK_MEMORY;
            }
            if self.bits == before {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Features;

    #[test]
    fn default_is_mvp() {
        let features = Features::new();
        assert!(!features.simd_enabled());
        assert!(!features.bulk_memory_enabled());
        assert_eq!(features, Features::default());
    }

    #[test]
    fn dependencies_are_transitive() {
        let mut features = Features::new();
        features.enable_gc();
        assert!(features.function_references_enabled());
        assert!(features.reference_types_enabled());
        assert!(features.bulk_memory_enabled());
        assert!(!features.simd_enabled());
    }

    #[test]
    fn exceptions_imply_reference_types() {
        let mut features = Features::new();
        features.enable_exceptions();
        assert!(features.reference_types_enabled());
        assert!(features.bulk_memory_enabled());
    }

    #[test]
    fn memories_imply_bulk_memory() {
        let mut features = Features::new();
        features.enable_memory64();
        assert!(features.bulk_memory_enabled());

        let mut features = Features::new();
        features.enable_multi_memory();
        assert!(features.bulk_memory_enabled());
    }

    #[test]
    fn disable_does_not_propagate() {
        let mut features = Features::new();
        features.enable_reference_types();
        assert!(features.bulk_memory_enabled());
        features.disable_reference_types();
        // The dependent stays on.
        assert!(features.bulk_memory_enabled());
        assert!(!features.reference_types_enabled());
    }

    #[test]
    fn disabling_a_dependency_reverts_while_dependent_is_on() {
        let mut features = Features::new();
        features.enable_gc();
        features.disable_reference_types();
        // The closure re-enables it immediately.
        assert!(features.reference_types_enabled());
    }

    #[test]
    fn has_features() {
        let mut all = Features::new();
        all.enable_all();

        let mut subset = Features::new();
        subset.enable_simd();
        subset.enable_threads();

        assert!(all.has_features(subset));
        assert!(!subset.has_features(all));
        assert!(subset.has_features(Features::new()));
    }
}
