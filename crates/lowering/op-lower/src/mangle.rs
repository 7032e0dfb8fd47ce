//! Symbol mangling
//!
//! Function identity is the overload key, so labels are baked into the
//! emitted symbol. An unlabeled parameter contributes `_`, keeping
//! `move(to:)` and `move(_:)` distinct in the object file the same way
//! they are distinct to the resolver.

/// `name__label1_label2` for a free function
pub fn function_symbol(name: &str, labels: &[Option<String>]) -> String {
    let suffix = labels
        .iter()
        .map(|label| label.as_deref().unwrap_or("_"))
        .collect::<Vec<_>>()
        .join("_");
    format!("{name}__{suffix}")
}

/// `Type_name__labels`; methods take an explicit leading `self`.
/// Companion methods pass the companion's own name (`Type_static`),
/// which yields the `Type_static_name__labels` spelling
pub fn method_symbol(type_name: &str, name: &str, labels: &[Option<String>]) -> String {
    format!("{type_name}_{}", function_symbol(name, labels))
}

/// The v-table member for a method: the symbol without its type prefix
pub fn vtable_member(name: &str, labels: &[Option<String>]) -> String {
    function_symbol(name, labels)
}

/// Struct and global names derived from a type's name
pub mod type_names {
    /// The per-level field struct
    pub fn layer(type_name: &str) -> String {
        format!("__{type_name}_data")
    }

    /// The type-info global consumed by the allocator
    pub fn info(type_name: &str) -> String {
        format!("__{type_name}_info")
    }

    pub fn data_descriptor(type_name: &str) -> String {
        format!("__{type_name}_data_type")
    }

    pub fn object_descriptor(type_name: &str) -> String {
        format!("__{type_name}_object_type")
    }

    /// The method v-table struct of an object
    pub fn vtable_struct(type_name: &str) -> String {
        format!("__{type_name}_vtable")
    }

    /// The v-table instance of an object
    pub fn vtable_instance(type_name: &str) -> String {
        format!("{type_name}_vtable")
    }

    /// The companion singleton's struct
    pub fn companion_struct(type_name: &str) -> String {
        format!("__{type_name}_static")
    }

    /// The trait descriptor global
    pub fn trait_descriptor(trait_name: &str) -> String {
        format!("{trait_name}_trait")
    }

    /// The trait's v-table struct
    pub fn trait_vtable_struct(trait_name: &str) -> String {
        format!("{trait_name}_vtable")
    }

    /// The v-table instance for one (type, trait) pair
    pub fn conformance_vtable(type_name: &str, trait_name: &str) -> String {
        format!("{type_name}_{trait_name}_vtable")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_function_symbols_bake_in_labels() {
        assert_eq!(
            function_symbol("greet", &[Some("to".to_string())]),
            "greet__to"
        );
        assert_eq!(function_symbol("greet", &[None]), "greet___");
        assert_eq!(
            function_symbol("move", &[Some("from".to_string()), Some("to".to_string())]),
            "move__from_to"
        );
        assert_eq!(function_symbol("main_loop", &[]), "main_loop__");
    }

    #[test]
    fn labeled_and_unlabeled_overloads_get_distinct_symbols() {
        let labeled = function_symbol("push", &[Some("onto".to_string())]);
        let unlabeled = function_symbol("push", &[None]);
        assert_ne!(labeled, unlabeled);
    }

    #[test]
    fn method_symbols_prefix_the_owner() {
        assert_eq!(
            method_symbol("Point", "scale", &[Some("by".to_string())]),
            "Point_scale__by"
        );
        assert_eq!(method_symbol("Point_static", "origin", &[]), "Point_static_origin__");
    }
}
