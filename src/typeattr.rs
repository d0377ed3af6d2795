// Copyright (c) Microsoft Corporation.
// SPDX-License-Identifier: MIT
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeFlavor {
    Type,
    Attribute,
}

/// A resolved reference to a type or a type attribute.
///
/// Rules only ever render these by name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeOrAttr {
    name: String,
    flavor: TypeFlavor,
}

impl TypeOrAttr {
    pub fn new_type(name: &str) -> Self {
        TypeOrAttr {
            name: name.to_string(),
            flavor: TypeFlavor::Type,
        }
    }

    pub fn new_attribute(name: &str) -> Self {
        TypeOrAttr {
            name: name.to_string(),
            flavor: TypeFlavor::Attribute,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn flavor(&self) -> TypeFlavor {
        self.flavor
    }

    pub fn is_attribute(&self) -> bool {
        self.flavor == TypeFlavor::Attribute
    }
}

impl fmt::Display for TypeOrAttr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
