//! # Damage
//!
//! [`DamageEntityEvent`] carries a base damage and an ordered list of
//! [`DamageFunction`]s. Each function receives the damage accumulated so far
//! and returns the amount its modifier adds (negative to reduce). The final
//! damage is the base plus every delta, applied in list order.
//!
//! With a base of `1.0`, a doubling function followed by a `x5` function
//! contributes `2.0` and then `15.0`, for a final damage of `18.0`.

use crate::cause::Cause;
use crate::error::EventError;
use crate::event::CancelFlag;
use crate::impl_cancellable_event;
use lodestone_data::ResourceKey;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Category of a damage modifier, such as armor or a critical hit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DamageModifierType(ResourceKey);

impl DamageModifierType {
    pub fn new(id: ResourceKey) -> Self {
        Self(id)
    }

    pub fn id(&self) -> &ResourceKey {
        &self.0
    }
}

impl fmt::Display for DamageModifierType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Standard modifier types.
pub mod damage_modifier_types {
    use super::DamageModifierType;
    use lodestone_data::ResourceKey;

    lazy_static::lazy_static! {
        pub static ref ABSORPTION: DamageModifierType = DamageModifierType::new(ResourceKey::lodestone("absorption"));
        pub static ref ARMOR: DamageModifierType = DamageModifierType::new(ResourceKey::lodestone("armor"));
        pub static ref ARMOR_ENCHANTMENT: DamageModifierType = DamageModifierType::new(ResourceKey::lodestone("armor_enchantment"));
        pub static ref ATTACK_COOLDOWN: DamageModifierType = DamageModifierType::new(ResourceKey::lodestone("attack_cooldown"));
        pub static ref CRITICAL_HIT: DamageModifierType = DamageModifierType::new(ResourceKey::lodestone("critical_hit"));
        pub static ref DEFENSIVE_POTION_EFFECT: DamageModifierType = DamageModifierType::new(ResourceKey::lodestone("defensive_potion_effect"));
        pub static ref DIFFICULTY: DamageModifierType = DamageModifierType::new(ResourceKey::lodestone("difficulty"));
        pub static ref HARD_HAT: DamageModifierType = DamageModifierType::new(ResourceKey::lodestone("hard_hat"));
        pub static ref MAGIC: DamageModifierType = DamageModifierType::new(ResourceKey::lodestone("magic"));
        pub static ref NEGATIVE_POTION_EFFECT: DamageModifierType = DamageModifierType::new(ResourceKey::lodestone("negative_potion_effect"));
        pub static ref OFFENSIVE_POTION_EFFECT: DamageModifierType = DamageModifierType::new(ResourceKey::lodestone("offensive_potion_effect"));
        pub static ref SHIELD: DamageModifierType = DamageModifierType::new(ResourceKey::lodestone("shield"));
        pub static ref SWEEPING: DamageModifierType = DamageModifierType::new(ResourceKey::lodestone("sweeping"));
        pub static ref WEAPON_ENCHANTMENT: DamageModifierType = DamageModifierType::new(ResourceKey::lodestone("weapon_enchantment"));
    }
}

/// A single contribution to the damage of an attack.
///
/// Modifiers are equal when both their type and their group are equal; the
/// group tells apart several modifiers of the same type, e.g. one per armor
/// piece.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DamageModifier {
    kind: DamageModifierType,
    group: String,
}

impl DamageModifier {
    pub fn new(kind: DamageModifierType) -> Self {
        let group = kind.to_string();
        Self { kind, group }
    }

    pub fn with_group(mut self, group: &str) -> Self {
        self.group = group.to_string();
        self
    }

    pub fn kind(&self) -> &DamageModifierType {
        &self.kind
    }

    pub fn group(&self) -> &str {
        &self.group
    }
}

impl fmt::Display for DamageModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.kind, self.group)
    }
}

type DeltaFn = dyn Fn(f64) -> f64 + Send + Sync;

/// A modifier paired with the function computing its damage delta.
#[derive(Clone)]
pub struct DamageFunction {
    modifier: DamageModifier,
    function: Arc<DeltaFn>,
}

impl DamageFunction {
    pub fn of<F>(modifier: DamageModifier, function: F) -> Self
    where
        F: Fn(f64) -> f64 + Send + Sync + 'static,
    {
        Self {
            modifier,
            function: Arc::new(function),
        }
    }

    pub fn modifier(&self) -> &DamageModifier {
        &self.modifier
    }

    /// Delta contributed when `damage` has accumulated so far.
    pub fn apply(&self, damage: f64) -> f64 {
        (self.function)(damage)
    }
}

impl fmt::Debug for DamageFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DamageFunction")
            .field("modifier", &self.modifier)
            .finish_non_exhaustive()
    }
}

/// Computes each modifier's delta and the resulting total.
fn evaluate(base: f64, functions: &[DamageFunction]) -> (Vec<(DamageModifier, f64)>, f64) {
    let mut damage = base;
    let mut deltas = Vec::with_capacity(functions.len());
    for function in functions {
        let delta = function.apply(damage);
        damage += delta;
        deltas.push((function.modifier.clone(), delta));
    }
    (deltas, damage)
}

fn not_applicable(modifier: &DamageModifier) -> EventError {
    EventError::InvalidModifier(format!("modifier {} is not applicable", modifier))
}

fn duplicate(modifier: &DamageModifier) -> EventError {
    EventError::InvalidModifier(format!("modifier {} is already present", modifier))
}

/// Fired when an entity is about to take damage.
#[derive(Debug)]
pub struct DamageEntityEvent {
    cause: Cause,
    cancelled: CancelFlag,
    target: Uuid,
    original_damage: f64,
    original_functions: Vec<DamageFunction>,
    original_damages: Vec<(DamageModifier, f64)>,
    original_final_damage: f64,
    base_damage: f64,
    functions: Vec<DamageFunction>,
    damages: Vec<(DamageModifier, f64)>,
    final_damage: f64,
}

impl_cancellable_event!(DamageEntityEvent);

impl DamageEntityEvent {
    /// Creates the event.
    ///
    /// # Returns
    ///
    /// `Err(EventError::InvalidModifier)` when a modifier appears twice in
    /// `functions`.
    pub fn new(
        cause: Cause,
        target: Uuid,
        functions: Vec<DamageFunction>,
        original_damage: f64,
    ) -> Result<Self, EventError> {
        for (i, function) in functions.iter().enumerate() {
            if functions[..i].iter().any(|f| f.modifier == function.modifier) {
                return Err(duplicate(&function.modifier));
            }
        }

        let (original_damages, original_final_damage) = evaluate(original_damage, &functions);
        Ok(Self {
            cause,
            cancelled: CancelFlag::default(),
            target,
            original_damage,
            original_functions: functions.clone(),
            original_damages: original_damages.clone(),
            original_final_damage,
            base_damage: original_damage,
            functions,
            damages: original_damages,
            final_damage: original_final_damage,
        })
    }

    /// The entity taking damage.
    pub fn target(&self) -> Uuid {
        self.target
    }

    pub fn original_damage(&self) -> f64 {
        self.original_damage
    }

    pub fn original_functions(&self) -> &[DamageFunction] {
        &self.original_functions
    }

    /// Delta of every original modifier, in application order.
    pub fn original_damages(&self) -> &[(DamageModifier, f64)] {
        &self.original_damages
    }

    pub fn original_modifier_damage(&self, modifier: &DamageModifier) -> Result<f64, EventError> {
        self.original_damages
            .iter()
            .find(|(m, _)| m == modifier)
            .map(|(_, delta)| *delta)
            .ok_or_else(|| not_applicable(modifier))
    }

    pub fn original_final_damage(&self) -> f64 {
        self.original_final_damage
    }

    pub fn base_damage(&self) -> f64 {
        self.base_damage
    }

    pub fn set_base_damage(&mut self, base_damage: f64) {
        self.base_damage = base_damage;
        self.recalculate();
    }

    pub fn final_damage(&self) -> f64 {
        self.final_damage
    }

    pub fn is_modifier_applicable(&self, modifier: &DamageModifier) -> bool {
        self.functions.iter().any(|f| &f.modifier == modifier)
    }

    /// Current delta of `modifier`.
    pub fn damage(&self, modifier: &DamageModifier) -> Result<f64, EventError> {
        self.damages
            .iter()
            .find(|(m, _)| m == modifier)
            .map(|(_, delta)| *delta)
            .ok_or_else(|| not_applicable(modifier))
    }

    /// Replaces the function of `modifier` in place, or appends the modifier
    /// when it is not present yet.
    pub fn set_damage<F>(&mut self, modifier: DamageModifier, function: F)
    where
        F: Fn(f64) -> f64 + Send + Sync + 'static,
    {
        let replacement = DamageFunction::of(modifier, function);
        match self
            .functions
            .iter()
            .position(|f| f.modifier == replacement.modifier)
        {
            Some(index) => self.functions[index] = replacement,
            None => self.functions.push(replacement),
        }
        self.recalculate();
    }

    /// Inserts `modifier` before the last present modifier whose type is in
    /// `before`, or appends it when there is none.
    pub fn add_modifier_before<F>(
        &mut self,
        modifier: DamageModifier,
        function: F,
        before: &HashSet<DamageModifierType>,
    ) -> Result<(), EventError>
    where
        F: Fn(f64) -> f64 + Send + Sync + 'static,
    {
        let anchor = self.anchor(&modifier, before)?;
        let function = DamageFunction::of(modifier, function);
        match anchor {
            Some(index) => self.functions.insert(index, function),
            None => self.functions.push(function),
        }
        self.recalculate();
        Ok(())
    }

    /// Inserts `modifier` after the last present modifier whose type is in
    /// `after`, or appends it when there is none.
    pub fn add_modifier_after<F>(
        &mut self,
        modifier: DamageModifier,
        function: F,
        after: &HashSet<DamageModifierType>,
    ) -> Result<(), EventError>
    where
        F: Fn(f64) -> f64 + Send + Sync + 'static,
    {
        let anchor = self.anchor(&modifier, after)?;
        let function = DamageFunction::of(modifier, function);
        match anchor {
            Some(index) => self.functions.insert(index + 1, function),
            None => self.functions.push(function),
        }
        self.recalculate();
        Ok(())
    }

    /// The current modifiers, in application order.
    pub fn modifiers(&self) -> &[DamageFunction] {
        &self.functions
    }

    /// Whether the final damage would bring `current_health` to zero or below.
    pub fn will_cause_death(&self, current_health: f64) -> bool {
        current_health - self.final_damage <= 0.0
    }

    fn anchor(
        &self,
        modifier: &DamageModifier,
        kinds: &HashSet<DamageModifierType>,
    ) -> Result<Option<usize>, EventError> {
        if self.is_modifier_applicable(modifier) {
            return Err(duplicate(modifier));
        }
        Ok(self
            .functions
            .iter()
            .rposition(|f| kinds.contains(f.modifier.kind())))
    }

    fn recalculate(&mut self) {
        let (damages, final_damage) = evaluate(self.base_damage, &self.functions);
        self.damages = damages;
        self.final_damage = final_damage;
    }
}
