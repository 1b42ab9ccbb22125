//! Map from local index to value type inside a code body, including the
//! nested scopes introduced by `let`.

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

use crate::types::ValueType;

// Each scope is run-length encoded as (type, cumulative count within the
// scope), which keeps lookup a binary search per scope.
type Scope = Vec<(ValueType, u32)>;

/// Local index space of a code body.
///
/// `let` pushes a scope whose locals come *before* every outer local in the
/// index space; lookup therefore walks scopes innermost-first.
#[derive(Debug, Clone)]
pub struct LocalMap {
    scopes: Vec<Scope>,
}

fn scope_count(scope: &Scope) -> u32 {
    scope.last().map_or(0, |run| run.1)
}

impl Default for LocalMap {
    fn default() -> Self {
        Self {
            scopes: vec![Scope::new()],
        }
    }
}

impl LocalMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.scopes.clear();
        self.scopes.push(Scope::new());
    }

    /// Enters a `let` scope.
    pub fn push(&mut self) {
        self.scopes.push(Scope::new());
    }

    /// Leaves the innermost `let` scope, dropping its locals. The outermost
    /// scope (the function's own locals) cannot be popped.
    pub fn pop(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    pub fn get_count(&self) -> u32 {
        self.scopes.iter().map(|scope| scope_count(scope)).sum()
    }

    pub fn get_type(&self, index: u32) -> Option<&ValueType> {
        let mut index = index;
        for scope in self.scopes.iter().rev() {
            let count = scope_count(scope);
            if index < count {
                let pos = scope.partition_point(|run| run.1 <= index);
                return scope.get(pos).map(|run| &run.0);
            }
            index -= count;
        }
        None
    }

    /// Appends `count` locals of `value_type` to the innermost scope.
    /// Refuses (returning `false`) when the total would exceed `u32::MAX`.
    pub fn append(&mut self, count: u32, value_type: ValueType) -> bool {
        if count == 0 {
            return true;
        }
        if !self.can_append(count) {
            return false;
        }

        let scope = self.scopes.last_mut().unwrap();
        let total = scope_count(scope) + count;
        scope.push((value_type, total));
        true
    }

    /// Appends one local per element, merging runs of equal types.
    pub fn append_types(&mut self, value_types: &[ValueType]) -> bool {
        if value_types.is_empty() {
            return true;
        }
        let Ok(count) = u32::try_from(value_types.len()) else {
            return false;
        };
        if !self.can_append(count) {
            return false;
        }

        let scope = self.scopes.last_mut().unwrap();
        for value_type in value_types {
            match scope.last_mut() {
                Some(run) if run.0 == *value_type => run.1 += 1,
                _ => {
                    let total = scope_count(scope) + 1;
                    scope.push((value_type.clone(), total));
                }
            }
        }
        true
    }

    fn can_append(&self, count: u32) -> bool {
        self.get_count() <= u32::MAX - count
    }
}

#[cfg(test)]
mod tests {
    use super::LocalMap;
    use crate::types::ValueType;

    #[test]
    fn empty() {
        let locals = LocalMap::new();
        assert_eq!(locals.get_count(), 0);
        assert_eq!(locals.get_type(0), None);
    }

    #[test]
    fn runs_are_binary_searchable() {
        let mut locals = LocalMap::new();
        assert!(locals.append(2, ValueType::I32));
        assert!(locals.append(3, ValueType::F64));
        assert!(locals.append(1, ValueType::I64));

        assert_eq!(locals.get_count(), 6);
        assert_eq!(locals.get_type(0), Some(&ValueType::I32));
        assert_eq!(locals.get_type(1), Some(&ValueType::I32));
        assert_eq!(locals.get_type(2), Some(&ValueType::F64));
        assert_eq!(locals.get_type(4), Some(&ValueType::F64));
        assert_eq!(locals.get_type(5), Some(&ValueType::I64));
        assert_eq!(locals.get_type(6), None);
    }

    #[test]
    fn append_zero_is_a_no_op() {
        let mut locals = LocalMap::new();
        assert!(locals.append(0, ValueType::I32));
        assert_eq!(locals.get_count(), 0);
    }

    #[test]
    fn append_refuses_overflow() {
        let mut locals = LocalMap::new();
        assert!(locals.append(u32::MAX, ValueType::I32));
        assert!(!locals.append(1, ValueType::I32));
        assert_eq!(locals.get_count(), u32::MAX);
    }

    #[test]
    fn append_types_merges_runs() {
        let mut locals = LocalMap::new();
        assert!(locals.append_types(&[
            ValueType::I32,
            ValueType::I32,
            ValueType::F32,
            ValueType::I32,
        ]));
        assert_eq!(locals.get_count(), 4);
        assert_eq!(locals.get_type(1), Some(&ValueType::I32));
        assert_eq!(locals.get_type(2), Some(&ValueType::F32));
        assert_eq!(locals.get_type(3), Some(&ValueType::I32));
    }

    #[test]
    fn let_locals_come_before_outer_locals() {
        let mut locals = LocalMap::new();
        assert!(locals.append(2, ValueType::I32));

        locals.push();
        assert!(locals.append(1, ValueType::F32));

        // Index 0 is the innermost `let` local, the function locals follow.
        assert_eq!(locals.get_count(), 3);
        assert_eq!(locals.get_type(0), Some(&ValueType::F32));
        assert_eq!(locals.get_type(1), Some(&ValueType::I32));
        assert_eq!(locals.get_type(2), Some(&ValueType::I32));

        locals.pop();
        assert_eq!(locals.get_count(), 2);
        assert_eq!(locals.get_type(0), Some(&ValueType::I32));
    }

    #[test]
    fn outermost_scope_is_not_poppable() {
        let mut locals = LocalMap::new();
        assert!(locals.append(1, ValueType::I32));
        locals.pop();
        assert_eq!(locals.get_count(), 1);
    }
}
