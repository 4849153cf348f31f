//! Entity registry: logical entity names to remote tables and key columns
//!
//! Replay needs to know the primary-key column of each remote table. The
//! naming convention (singularize the table name, prefix `id_`) covers most
//! of the schema, but a handful of tables are irregular, so every entity
//! the application writes is declared explicitly here and the convention is
//! only a fallback for names nobody registered.

use std::collections::HashMap;

/// Remote-side identity of a logical entity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityMapping {
    /// Remote table name.
    pub table: String,
    /// Primary-key column of that table.
    pub primary_key: String,
}

impl EntityMapping {
    pub fn new(table: impl Into<String>, primary_key: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            primary_key: primary_key.into(),
        }
    }
}

/// Statically declared entity-to-table mapping.
#[derive(Clone, Debug, Default)]
pub struct EntityRegistry {
    entries: HashMap<String, EntityMapping>,
}

impl EntityRegistry {
    /// An empty registry; every lookup falls back to the convention.
    pub fn new() -> Self {
        Self::default()
    }

    /// The application's schema, irregular names included.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("residuo", EntityMapping::new("residuo", "id_residuo"));
        registry.register("entidades", EntityMapping::new("entidades", "id_entidade"));
        registry.register("eventos", EntityMapping::new("eventos", "id_evento"));
        // Irregular: plural marker sits mid-name.
        registry.register(
            "pontos_recolha",
            EntityMapping::new("pontos_recolha", "id_ponto_recolha"),
        );
        // Irregular: plural in "-es", convention would derive "utilizadore".
        registry.register(
            "utilizadores",
            EntityMapping::new("utilizadores", "id_utilizador"),
        );
        registry.register(
            "tabela_precos",
            EntityMapping::new("tabela_precos", "id_tabela_preco"),
        );
        registry
    }

    /// Declare or replace an entity mapping.
    pub fn register(&mut self, entity: impl Into<String>, mapping: EntityMapping) {
        self.entries.insert(entity.into(), mapping);
    }

    /// Resolve an entity to its remote identity. Unregistered names use the
    /// derivation convention so new regular tables keep working.
    pub fn resolve(&self, entity: &str) -> EntityMapping {
        self.entries
            .get(entity)
            .cloned()
            .unwrap_or_else(|| EntityMapping::new(entity, derive_primary_key(entity)))
    }

    /// Whether the entity was explicitly declared.
    pub fn is_registered(&self, entity: &str) -> bool {
        self.entries.contains_key(entity)
    }
}

/// Convention: singularize the table name (strip one trailing `s`) and
/// prefix with `id_`.
fn derive_primary_key(table: &str) -> String {
    let singular = table.strip_suffix('s').unwrap_or(table);
    format!("id_{singular}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_registered_entities_resolve_exactly() {
        let registry = EntityRegistry::with_defaults();

        let residuo = registry.resolve("residuo");
        assert_eq!(residuo.table, "residuo");
        assert_eq!(residuo.primary_key, "id_residuo");

        let pontos = registry.resolve("pontos_recolha");
        assert_eq!(pontos.primary_key, "id_ponto_recolha");

        let utilizadores = registry.resolve("utilizadores");
        assert_eq!(utilizadores.primary_key, "id_utilizador");
    }

    #[test]
    fn test_unregistered_entity_uses_convention() {
        let registry = EntityRegistry::with_defaults();

        let mapping = registry.resolve("campanhas");
        assert!(!registry.is_registered("campanhas"));
        assert_eq!(mapping.table, "campanhas");
        assert_eq!(mapping.primary_key, "id_campanha");
    }

    #[test]
    fn test_convention_handles_singular_names() {
        assert_eq!(derive_primary_key("residuo"), "id_residuo");
        assert_eq!(derive_primary_key("eventos"), "id_evento");
    }

    #[test]
    fn test_explicit_registration_overrides_convention() {
        let mut registry = EntityRegistry::new();
        registry.register("precos", EntityMapping::new("precos", "codigo_preco"));

        assert_eq!(registry.resolve("precos").primary_key, "codigo_preco");
    }

    proptest! {
        #[test]
        fn prop_derived_key_is_prefixed_and_singular(name in "[a-z_]{1,24}") {
            let key = derive_primary_key(&name);
            prop_assert!(key.starts_with("id_"));
            // Stripping is bounded: at most one trailing 's' is removed.
            let singular = &key[3..];
            let pluralized = format!("{}s", singular);
            prop_assert!(name == singular || name == pluralized);
        }
    }
}
