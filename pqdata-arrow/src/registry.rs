use crate::{
    kind::ClassName,
    sparse::{CooMatrix, SparseMatrix},
};

const SPARSE_MODULE: &str = "scipy.sparse";

/// Sparse classes a coordinate table may be converted into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SparseClass {
    Coo,
    Csr,
    Csc,
}

/// Allow-list of class identifiers. Anything else is rejected.
const REGISTRY: &[(&str, SparseClass)] = &[
    ("coo_matrix", SparseClass::Coo),
    ("coo_array", SparseClass::Coo),
    ("csr_matrix", SparseClass::Csr),
    ("csr_array", SparseClass::Csr),
    ("csc_matrix", SparseClass::Csc),
    ("csc_array", SparseClass::Csc),
];

impl SparseClass {
    /// Looks a recorded class name up in the registry.
    ///
    /// Private submodules (`scipy.sparse._csr`) are accepted as well.
    pub fn resolve(class: &ClassName) -> Result<Self, String> {
        let module_known = class.module == SPARSE_MODULE
            || class
                .module
                .strip_prefix(SPARSE_MODULE)
                .is_some_and(|rest| rest.starts_with('.'));
        if !module_known {
            return Err(format!("module '{}' is not registered", class.module));
        }

        REGISTRY
            .iter()
            .find(|(name, _)| *name == class.name)
            .map(|(_, sparse_class)| *sparse_class)
            .ok_or_else(|| format!("class '{}' is not registered", class.name))
    }

    /// The class name recorded when writing a matrix of this class.
    pub fn class_name(&self) -> ClassName {
        let name = match self {
            SparseClass::Coo => "coo_matrix",
            SparseClass::Csr => "csr_matrix",
            SparseClass::Csc => "csc_matrix",
        };
        ClassName {
            module: SPARSE_MODULE.to_string(),
            name: name.to_string(),
        }
    }

    pub fn convert(&self, matrix: CooMatrix) -> SparseMatrix {
        match self {
            SparseClass::Coo => SparseMatrix::Coo(matrix),
            SparseClass::Csr => SparseMatrix::Csr(matrix.to_csr()),
            SparseClass::Csc => SparseMatrix::Csc(matrix.to_csc()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(module: &str, name: &str) -> ClassName {
        ClassName {
            module: module.to_string(),
            name: name.to_string(),
        }
    }

    #[test]
    fn resolves_registered_names() {
        assert_eq!(
            SparseClass::resolve(&class("scipy.sparse", "csr_matrix")),
            Ok(SparseClass::Csr)
        );
        assert_eq!(
            SparseClass::resolve(&class("scipy.sparse._csc", "csc_array")),
            Ok(SparseClass::Csc)
        );
        assert_eq!(
            SparseClass::resolve(&SparseClass::Coo.class_name()),
            Ok(SparseClass::Coo)
        );
    }

    #[test]
    fn rejects_unregistered_names() {
        assert!(SparseClass::resolve(&class("os", "system")).is_err());
        assert!(SparseClass::resolve(&class("scipy.sparsefoo", "csr_matrix")).is_err());
        assert!(SparseClass::resolve(&class("scipy.sparse", "dok_matrix")).is_err());
    }
}
