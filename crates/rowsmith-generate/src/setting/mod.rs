//! Default value suppliers and auto-generation policy, by column matcher,
//! declared type name or engine type.

pub mod defaults;
mod layered;
mod matcher;
mod policy;

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use fake::{Dummy, Fake};
use rowsmith_core::{ColumnDescriptor, ColumnProperty, EngineType, PropertySet, Value};
use tracing::debug;

use crate::errors::GenerationError;
use crate::supplier::{
    BoxedSupplier, NullDice, SharedSupplier, SupplierDecider, ValueSupplier, decider, fixed,
    fresh_rng,
};

pub use defaults::defaults;
pub use layered::LayeredSetting;
pub use matcher::ColumnMatcher;
pub use policy::allows_by_properties;

/// Read side of a setting, shared by single and layered settings.
pub trait SettingInfo: Send + Sync {
    fn default_rows(&self) -> u64;

    /// Supplier for an unconfigured column, if this setting knows one.
    fn resolve_supplier(&self, column: &ColumnDescriptor) -> Option<BoxedSupplier>;

    /// Whether an unconfigured column is populated at all.
    fn is_auto_generating(&self, column: &ColumnDescriptor) -> bool;
}

/// Target of a `given_type` registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeTarget {
    Engine(EngineType),
    Name(String),
}

impl From<EngineType> for TypeTarget {
    fn from(value: EngineType) -> Self {
        TypeTarget::Engine(value)
    }
}

impl From<&str> for TypeTarget {
    fn from(value: &str) -> Self {
        TypeTarget::Name(value.to_string())
    }
}

impl From<String> for TypeTarget {
    fn from(value: String) -> Self {
        TypeTarget::Name(value)
    }
}

/// Supplier and policy configuration.
///
/// Built by chaining; an invalid argument is remembered and reported by
/// [`DataSetting::validate`], which runs when the setting is attached to a
/// facet or a generator.
#[derive(Clone)]
pub struct DataSetting {
    default_rows: u64,
    auto_generating: PropertySet,
    generate_null: bool,
    dice_sides: u32,
    large_text: (usize, usize),
    by_matcher: Vec<(ColumnMatcher, SupplierDecider)>,
    by_type_name: HashMap<String, SupplierDecider>,
    by_engine_type: HashMap<EngineType, SupplierDecider>,
    exclusion: Option<ColumnMatcher>,
    unsupported: HashSet<EngineType>,
    error: Option<String>,
}

impl DataSetting {
    /// A setting seeded from the global defaults' row count, auto-generation
    /// flags, null odds and large text window.
    ///
    /// Supplier registrations stay on the defaults, which every layered
    /// setting consults last.
    pub fn new() -> Self {
        let base = defaults();
        let (min, max) = base.large_text;
        Self {
            default_rows: base.default_rows,
            auto_generating: base.auto_generating,
            generate_null: base.generate_null,
            dice_sides: base.dice_sides,
            ..Self::blank()
        }
        .large_text_length(min, max)
    }

    pub(crate) fn blank() -> Self {
        Self {
            default_rows: defaults::DEFAULT_ROWS,
            auto_generating: defaults::default_auto_generating(),
            generate_null: defaults::DEFAULT_GENERATE_NULL,
            dice_sides: defaults::DEFAULT_DICE_SIDES,
            large_text: (
                defaults::LARGE_TEXT_MIN_LENGTH,
                defaults::LARGE_TEXT_MAX_LENGTH,
            ),
            by_matcher: Vec::new(),
            by_type_name: HashMap::new(),
            by_engine_type: HashMap::new(),
            exclusion: None,
            unsupported: HashSet::new(),
            error: None,
        }
    }

    pub fn given_type(self, target: impl Into<TypeTarget>) -> SettingStep {
        let target = match target.into() {
            TypeTarget::Engine(engine_type) => StepTarget::Engine(engine_type),
            TypeTarget::Name(name) => StepTarget::Name(name.trim().to_uppercase()),
        };
        let setting = match &target {
            StepTarget::Name(name) if name.is_empty() => self.fail("type name must not be blank"),
            _ => self,
        };
        SettingStep { setting, target }
    }

    /// Registers a supplier for columns accepted by `matcher`.
    ///
    /// Matchers are tried in registration order and take precedence over
    /// type registrations.
    pub fn column_matcher(self, matcher: ColumnMatcher) -> SettingStep {
        SettingStep {
            setting: self,
            target: StepTarget::Matcher(matcher),
        }
    }

    /// Columns accepted by `matcher` are never generated automatically.
    pub fn exclude_when(mut self, matcher: ColumnMatcher) -> Self {
        self.exclusion = Some(matcher);
        self
    }

    pub fn auto_generate_for(mut self, properties: &[ColumnProperty]) -> Self {
        if properties.is_empty() {
            return self.fail("at least one property is required to set auto-generating");
        }
        for property in properties {
            self.auto_generating.insert(*property);
        }
        self
    }

    pub fn not_auto_generate_for(mut self, properties: &[ColumnProperty]) -> Self {
        if properties.is_empty() {
            return self.fail("at least one property is required to unset auto-generating");
        }
        for property in properties {
            self.auto_generating.remove(*property);
        }
        self
    }

    pub fn generate_null(mut self, enabled: bool) -> Self {
        self.generate_null = enabled;
        self
    }

    /// Enables null injection with odds of one in `sides`.
    pub fn generate_null_with_dice(mut self, sides: u32) -> Self {
        if sides < 2 {
            return self.fail(format!(
                "sides of dice must be greater than or equal to 2, got [{sides}]"
            ));
        }
        self.dice_sides = sides;
        self.generate_null = true;
        self
    }

    /// Length window of generated large text (LONGVARCHAR, CLOB and their
    /// national variants).
    pub fn large_text_length(mut self, min: usize, max: usize) -> Self {
        if max < min {
            return self.fail(format!(
                "max length of large text [{max}] must be greater than or equal to min length [{min}]"
            ));
        }
        self.large_text = (min, max);
        for engine_type in [
            EngineType::LongVarchar,
            EngineType::Clob,
            EngineType::LongNVarchar,
            EngineType::NClob,
        ] {
            self.by_engine_type.insert(
                engine_type,
                decider(move |_| defaults::text_supplier(min, max)),
            );
        }
        self
    }

    pub fn large_text_length_exact(self, length: usize) -> Self {
        self.large_text_length(length, length)
    }

    pub fn set_default_rows(mut self, rows: u64) -> Self {
        if rows == 0 {
            return self.fail("default number of rows must be greater than zero");
        }
        self.default_rows = rows;
        self
    }

    pub(crate) fn with_unsupported_types(
        mut self,
        types: impl IntoIterator<Item = EngineType>,
    ) -> Self {
        self.unsupported = types.into_iter().collect();
        self
    }

    pub fn auto_generating(&self) -> PropertySet {
        self.auto_generating
    }

    pub fn large_text_window(&self) -> (usize, usize) {
        self.large_text
    }

    pub fn null_dice(&self) -> Option<u32> {
        self.generate_null.then_some(self.dice_sides)
    }

    /// Reports the first invalid argument given while building.
    pub fn validate(&self) -> Result<(), GenerationError> {
        match &self.error {
            Some(message) => Err(GenerationError::config(message.clone())),
            None => Ok(()),
        }
    }

    fn fail(mut self, message: impl Into<String>) -> Self {
        self.error.get_or_insert_with(|| message.into());
        self
    }

    fn wrap(&self, column: &ColumnDescriptor, supplier: BoxedSupplier) -> BoxedSupplier {
        if self.generate_null && column.is_nullable() {
            debug!(column = %column, sides = self.dice_sides, "wrapping supplier with null dice");
            Box::new(NullDice::new(supplier, self.dice_sides))
        } else {
            supplier
        }
    }
}

impl Default for DataSetting {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingInfo for DataSetting {
    fn default_rows(&self) -> u64 {
        self.default_rows
    }

    fn resolve_supplier(&self, column: &ColumnDescriptor) -> Option<BoxedSupplier> {
        if let Some((matcher, decide)) = self
            .by_matcher
            .iter()
            .find(|(matcher, _)| matcher.matches(column))
        {
            debug!(column = %column, matcher = ?matcher, "supplier found by matcher");
            return Some(self.wrap(column, decide(column)));
        }

        if let Some(decide) = self.by_type_name.get(&column.type_name().to_uppercase()) {
            debug!(column = %column, "supplier found by type name");
            return Some(self.wrap(column, decide(column)));
        }

        if let Some(decide) = self.by_engine_type.get(&column.engine_type()) {
            debug!(column = %column, "supplier found by engine type");
            return Some(self.wrap(column, decide(column)));
        }

        if self.unsupported.contains(&column.engine_type()) {
            debug!(column = %column, "unsupported engine type, supplying null");
            return Some(Box::new(fixed(Value::Null)));
        }

        None
    }

    fn is_auto_generating(&self, column: &ColumnDescriptor) -> bool {
        if self
            .exclusion
            .as_ref()
            .is_some_and(|matcher| matcher.matches(column))
        {
            return false;
        }
        if self
            .by_matcher
            .iter()
            .any(|(matcher, _)| matcher.matches(column))
        {
            return true;
        }
        if !allows_by_properties(column, self.auto_generating) {
            return false;
        }
        if self
            .by_type_name
            .contains_key(&column.type_name().to_uppercase())
            || self.by_engine_type.contains_key(&column.engine_type())
        {
            return true;
        }
        !self.unsupported.contains(&column.engine_type())
    }
}

impl fmt::Debug for DataSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataSetting")
            .field("default_rows", &self.default_rows)
            .field("auto_generating", &self.auto_generating)
            .field("generate_null", &self.generate_null)
            .field("dice_sides", &self.dice_sides)
            .field("large_text", &self.large_text)
            .field("matchers", &self.by_matcher.len())
            .field("type_names", &self.by_type_name.len())
            .field("engine_types", &self.by_engine_type.len())
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
enum StepTarget {
    Engine(EngineType),
    Name(String),
    Matcher(ColumnMatcher),
}

/// Pending registration started by `given_type` or `column_matcher`.
pub struct SettingStep {
    setting: DataSetting,
    target: StepTarget,
}

impl SettingStep {
    /// One supplier shared by every column this registration matches.
    pub fn use_supplier(self, supplier: impl ValueSupplier + 'static) -> DataSetting {
        let shared = SharedSupplier::new(supplier);
        self.decide_with(decider(move |_| Box::new(shared.clone())))
    }

    /// Draws values from a `fake` generator, e.g. `fake::faker::name::en::Name()`.
    pub fn use_spec<T, F>(self, spec: F) -> DataSetting
    where
        F: Send + Sync + 'static,
        T: Dummy<F> + Into<Value> + 'static,
    {
        let spec = Arc::new(spec);
        self.decide_with(decider(move |_| {
            let spec = Arc::clone(&spec);
            let mut rng = fresh_rng();
            Box::new(move || {
                let spec_ref: &F = &spec;
                let value: T = spec_ref.fake_with_rng(&mut rng);
                Into::<Value>::into(value)
            })
        }))
    }

    pub fn decide_supplier<D>(self, decide: D) -> DataSetting
    where
        D: Fn(&ColumnDescriptor) -> BoxedSupplier + Send + Sync + 'static,
    {
        self.decide_with(decider(decide))
    }

    pub fn decide_with(self, decide: SupplierDecider) -> DataSetting {
        let SettingStep {
            mut setting,
            target,
        } = self;
        match target {
            StepTarget::Engine(engine_type) => {
                setting.by_engine_type.insert(engine_type, decide);
            }
            StepTarget::Name(name) => {
                if !name.is_empty() {
                    setting.by_type_name.insert(name, decide);
                }
            }
            StepTarget::Matcher(matcher) => setting.by_matcher.push((matcher, decide)),
        }
        setting
    }
}

impl fmt::Debug for SettingStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingStep")
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}
