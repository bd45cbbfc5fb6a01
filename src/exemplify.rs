//! Generate example instances from schemas.
//!
//! An example is taken from, in order of preference: the schema's explicit
//! `example`, its `default`, a random entry of its `enum`, and otherwise a
//! value synthesized from its type and constraints.
//!
//! Synthesized values are meant to satisfy the schema they were generated
//! from. Strings for a `pattern` are sampled from the pattern itself.

use crate::registry::Registry;
use crate::schema::{Additional, Dependency, Items, Schema, SchemaId, Type, TypeRef, TypeSpec};
use crate::vm;
use rand::distributions::Distribution;
use rand::rngs::ThreadRng;
use rand::seq::SliceRandom;
use rand::Rng;
use regex::Regex;
use serde_json::{Map, Number, Value};

const LOREM_IPSUM: &str = "Lorem ipsum dolor sit amet, consectetur adipiscing elit. Praesent mollis auctor vulputate. Morbi laoreet, orci ac mattis vehicula, urna dui feugiat enim, id elementum sapien nisi sit amet magna. Pellentesque habitant morbi tristique senectus et netus et malesuada fames ac turpis egestas. Nunc diam mauris, fermentum sed sollicitudin sed, aliquam non arcu. Donec eu quam orci.";

const SIMPLE_STRINGS: [&str; 4] = ["foo", "bar", "bat", "baz"];

/// From simplest to most complex.
const PREFERRED_TYPES: [Type; 7] = [
    Type::Null,
    Type::Boolean,
    Type::Integer,
    Type::Number,
    Type::String,
    Type::Array,
    Type::Object,
];

/// Beyond this depth nested values are generated minimally.
const MAXIMAL_DEPTH: usize = 16;

/// Beyond this depth nested values are `null`.
const MAX_DEPTH: usize = 48;

const MAX_UNIQUE_ATTEMPTS: usize = 100;
const MAX_PATTERN_ATTEMPTS: usize = 32;
const MAX_PATTERN_REPEAT: u32 = 8;
const MAX_COMBINATOR_ATTEMPTS: usize = 16;
const RETRY_DEPTH: usize = 3;

/// How much of a schema an example should exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExampleMode {
    /// The simplest type, and only required properties.
    Minimal,
    /// The most complex type, every declared property and some extras.
    Maximal,
}

impl Default for ExampleMode {
    fn default() -> Self {
        ExampleMode::Minimal
    }
}

/// Generates example instances for the schemas of one registry.
pub struct Exemplifier<'a, R = ThreadRng> {
    registry: &'a Registry,
    rng: R,
}

impl<'a> Exemplifier<'a, ThreadRng> {
    pub fn new(registry: &'a Registry) -> Self {
        Self::with_rng(registry, rand::thread_rng())
    }
}

impl<'a, R: Rng> Exemplifier<'a, R> {
    /// Use `rng` for every random choice, e.g. a seeded generator for
    /// reproducible examples.
    pub fn with_rng(registry: &'a Registry, rng: R) -> Self {
        Self { registry, rng }
    }

    pub fn exemplify(&mut self, schema: SchemaId, mode: ExampleMode) -> Value {
        self.example(schema, mode, 0)
    }

    fn example(&mut self, id: SchemaId, mode: ExampleMode, depth: usize) -> Value {
        if depth > MAX_DEPTH {
            return Value::Null;
        }

        let mode = if depth > MAXIMAL_DEPTH {
            ExampleMode::Minimal
        } else {
            mode
        };

        let registry = self.registry;
        let schema = &registry[id];
        if let Some(value) = self.explicit_example(schema) {
            return value;
        }

        // One alternative is layered over the node together with every
        // allOf member, and the result is checked against the whole node.
        // Schema-valued types are layered the same way in `example_of`.
        let alternatives = if schema.one_of.is_empty() {
            &schema.any_of
        } else {
            &schema.one_of
        };
        if !schema.all_of.is_empty() || !alternatives.is_empty() || has_schema_type(schema) {
            return self.checked(id, depth, |this| {
                let mut members = schema.all_of.clone();
                if let Some(alternative) = alternatives.choose(&mut this.rng) {
                    members.push(*alternative);
                }
                let merged = intersect(registry, schema, &members);
                this.example_of(&merged, mode, depth)
            });
        }

        self.example_of(schema, mode, depth)
    }

    /// Generate candidates until one validates against `id`, returning the
    /// last candidate if none does. Only shallow nodes get retries.
    fn checked<F>(&mut self, id: SchemaId, depth: usize, mut generate: F) -> Value
    where
        F: FnMut(&mut Self) -> Value,
    {
        let attempts = if depth < RETRY_DEPTH {
            MAX_COMBINATOR_ATTEMPTS
        } else {
            1
        };

        let mut candidate = Value::Null;
        for _ in 0..attempts {
            candidate = generate(self);
            if vm::validate(self.registry, id, &candidate).is_valid() {
                break;
            }
        }
        candidate
    }

    fn explicit_example(&mut self, schema: &Schema) -> Option<Value> {
        if let Some(example) = &schema.example {
            return Some(example.clone());
        }

        if let Some(default) = &schema.default {
            return Some(default.clone());
        }

        schema
            .enumeration
            .as_ref()
            .and_then(|values| values.choose(&mut self.rng))
            .cloned()
    }

    fn example_of(&mut self, schema: &Schema, mode: ExampleMode, depth: usize) -> Value {
        if depth > MAX_DEPTH {
            return Value::Null;
        }

        if let Some(value) = self.explicit_example(schema) {
            return value;
        }

        match self.select_type(schema, mode) {
            Some(TypeRef::Schema(id)) => {
                let registry = self.registry;
                let member = &registry[id];
                if !member.all_of.is_empty() || !member.any_of.is_empty() || !member.one_of.is_empty() {
                    return self.example(id, mode, depth + 1);
                }

                // The type schema narrows the node; the node's own keywords
                // still apply.
                let mut outer = schema.clone();
                outer.typ = TypeSpec::default();
                let merged = intersect(registry, &outer, &[id]);
                self.example_of(&merged, mode, depth + 1)
            }
            Some(TypeRef::Named(typ)) => self.synthesize(schema, typ, mode, depth),
            None => Value::Null,
        }
    }

    /// Pick the type to generate. Unions and `any` are narrowed by
    /// `disallow`, then the simplest (minimal) or most complex (maximal)
    /// remaining type wins.
    fn select_type(&mut self, schema: &Schema, mode: ExampleMode) -> Option<TypeRef> {
        let members: Vec<TypeRef> = match &schema.typ {
            TypeSpec::Single(TypeRef::Named(Type::Any)) => {
                PREFERRED_TYPES.iter().map(|typ| TypeRef::Named(*typ)).collect()
            }
            TypeSpec::Single(member) => return Some(*member),
            TypeSpec::Union(members) => {
                let mut expanded = vec![];
                for member in members {
                    match member {
                        TypeRef::Named(Type::Any) => {
                            expanded.extend(PREFERRED_TYPES.iter().map(|typ| TypeRef::Named(*typ)))
                        }
                        member => expanded.push(*member),
                    }
                }
                expanded
            }
        };

        let disallowed = schema.disallow.as_ref().map(TypeSpec::named).unwrap_or_default();
        if disallowed.contains(&Type::Any) {
            return None;
        }

        let allowed: Vec<TypeRef> = members
            .into_iter()
            .filter(|member| match member {
                // Integers are numbers too.
                TypeRef::Named(Type::Integer) => {
                    !disallowed.contains(&Type::Integer) && !disallowed.contains(&Type::Number)
                }
                TypeRef::Named(typ) => !disallowed.contains(typ),
                TypeRef::Schema(_) => true,
            })
            .collect();

        let mut preferred = PREFERRED_TYPES.to_vec();
        if mode == ExampleMode::Maximal {
            preferred.reverse();
        }

        preferred
            .into_iter()
            .map(TypeRef::Named)
            .find(|typ| allowed.contains(typ))
            .or_else(|| allowed.first().copied())
    }

    fn synthesize(&mut self, schema: &Schema, typ: Type, mode: ExampleMode, depth: usize) -> Value {
        match typ {
            Type::Null | Type::Any => Value::Null,
            Type::Boolean => Value::Bool(true),
            Type::String => Value::String(self.string(schema, mode)),
            Type::Integer => Value::from(self.integer(schema)),
            Type::Number => self.number(schema),
            Type::Object => Value::Object(self.object(schema, mode, depth)),
            Type::Array => Value::Array(self.array(schema, mode, depth)),
        }
    }

    fn string(&mut self, schema: &Schema, mode: ExampleMode) -> String {
        if let Some(format) = schema.format {
            return format.example(&mut self.rng);
        }

        if let Some(pattern) = &schema.pattern {
            if let Some(string) = self.pattern_string(schema, pattern) {
                return string;
            }
        }

        if schema.min_length.is_none() && schema.max_length.is_none() {
            return SIMPLE_STRINGS[self.rng.gen_range(0..SIMPLE_STRINGS.len())].to_owned();
        }

        let min = schema
            .min_length
            .unwrap_or_else(|| schema.max_length.map(|max| max.min(3)).unwrap_or(3));
        let len = match mode {
            ExampleMode::Minimal => min,
            ExampleMode::Maximal => {
                let max = schema.max_length.unwrap_or(min + 5).max(min);
                self.rng.gen_range(min..=max)
            }
        };

        LOREM_IPSUM.chars().cycle().take(len as usize).collect()
    }

    /// Sample strings from `pattern` until one also fits the length bounds.
    fn pattern_string(&mut self, schema: &Schema, pattern: &Regex) -> Option<String> {
        let generator = match rand_regex::Regex::compile(unanchored(pattern.as_str()), MAX_PATTERN_REPEAT) {
            Ok(generator) => generator,
            Err(_) => return None,
        };

        let fits = |string: &str| {
            let len = string.len() as u64;
            schema.min_length.map(|min| len >= min).unwrap_or(true)
                && schema.max_length.map(|max| len <= max).unwrap_or(true)
                && pattern.is_match(string)
        };

        (0..MAX_PATTERN_ATTEMPTS)
            .map(|_| -> String { generator.sample(&mut self.rng) })
            .find(|string| fits(string))
    }

    fn integer(&mut self, schema: &Schema) -> i64 {
        let (lo, hi) = integer_bounds(schema);
        if hi < lo {
            return lo;
        }

        match &schema.divisible_by {
            Some(divisor) => {
                let multiples: Vec<i64> = (lo..=hi.min(lo.saturating_add(10_000)))
                    .filter(|n| vm::is_divisible(&Number::from(*n), divisor))
                    .take(16)
                    .collect();

                match multiples.choose(&mut self.rng) {
                    Some(n) => *n,
                    None => first_multiple(lo, divisor).unwrap_or(lo),
                }
            }
            None => self.rng.gen_range(lo..=hi),
        }
    }

    fn number(&mut self, schema: &Schema) -> Value {
        if let Some(divisor) = schema.divisible_by.as_ref().and_then(Number::as_f64) {
            let value = number_multiple(schema, divisor);
            return Number::from_f64(value).map(Value::Number).unwrap_or(Value::Null);
        }

        let tenths = f64::from(self.rng.gen_range(1..=9u8));
        let (lo, hi) = integer_bounds(schema);
        let value = if hi > lo && lo > -EXACT_INTEGER && hi < EXACT_INTEGER {
            let whole = self.rng.gen_range(lo..hi) as f64;
            whole + 0.1 * tenths
        } else {
            number_between(schema, tenths / 10.0)
        };

        Number::from_f64(value).map(Value::Number).unwrap_or(Value::Null)
    }

    fn object(&mut self, schema: &Schema, mode: ExampleMode, depth: usize) -> Map<String, Value> {
        let mut obj = Map::new();

        if mode == ExampleMode::Maximal && !schema.pattern_properties.is_empty() {
            if let Some(examples) = &schema.pattern_property_examples {
                obj = examples.clone();
            }
        }

        for (name, property) in &schema.properties {
            if mode == ExampleMode::Maximal || schema.is_required(name) {
                // Keep nested values small, or maximal examples explode.
                let value = self.example(*property, ExampleMode::Minimal, depth + 1);
                obj.insert(name.clone(), value);
            }
        }

        for name in &schema.required {
            self.fill_member(schema, &mut obj, name, depth);
        }

        if mode == ExampleMode::Maximal {
            let extras = [("foo", Value::from(1)), ("bar", Value::from("A"))];
            for (name, value) in extras.iter() {
                if obj.contains_key(*name) || schema.pattern_properties.iter().any(|p| p.is_match(name)) {
                    continue;
                }

                match schema.additional_properties {
                    Additional::Allowed(true) => {
                        obj.insert((*name).to_owned(), value.clone());
                    }
                    Additional::Constrained(id) => {
                        let value = self.example(id, mode, depth + 1);
                        obj.insert((*name).to_owned(), value);
                    }
                    Additional::Allowed(false) => {}
                }
            }
        }

        for (dependent, dependency) in &schema.dependencies {
            if !obj.contains_key(dependent) {
                continue;
            }

            let names: &[String] = match dependency {
                Dependency::Name(name) => std::slice::from_ref(name),
                Dependency::Names(names) => names,
                Dependency::Schema(_) => continue,
            };

            for name in names {
                self.fill_member(schema, &mut obj, name, depth);
            }
        }

        obj
    }

    /// Make sure `name` is present in `obj`.
    fn fill_member(&mut self, schema: &Schema, obj: &mut Map<String, Value>, name: &str, depth: usize) {
        if obj.contains_key(name) {
            return;
        }

        let value = match schema.schema_for_member(name) {
            Some(member) => self.example(member, ExampleMode::Minimal, depth + 1),
            None => Value::Null,
        };
        obj.insert(name.to_owned(), value);
    }

    fn array(&mut self, schema: &Schema, mode: ExampleMode, depth: usize) -> Vec<Value> {
        let min = schema
            .min_items
            .unwrap_or_else(|| schema.max_items.map(|max| max.min(3)).unwrap_or(3));
        let max = schema.max_items.unwrap_or(min + 5).max(min);

        let mut len = match mode {
            ExampleMode::Minimal => min,
            ExampleMode::Maximal => max.min(min + 3),
        };

        if schema.unique_items && schema.min_items.map(|min| min <= 1).unwrap_or(true) {
            len = len.min(1);
        }

        if let Items::Tuple(ids) = &schema.items {
            if schema.additional_items == Additional::Allowed(false) {
                len = len.min(ids.len() as u64);
            }
        }

        let mut arr: Vec<Value> = vec![];
        let mut attempts = 0;
        while (arr.len() as u64) < len {
            let item = self.array_item(schema, arr.len(), mode, depth);
            if schema.unique_items && arr.contains(&item) {
                attempts += 1;
                if attempts >= MAX_UNIQUE_ATTEMPTS {
                    break;
                }
                continue;
            }
            arr.push(item);
        }

        arr
    }

    fn array_item(&mut self, schema: &Schema, index: usize, mode: ExampleMode, depth: usize) -> Value {
        match schema.schema_for_item(index) {
            Some(id) => self.example(id, mode, depth + 1),
            None => Value::from(self.rng.gen_range(0..=10_000)),
        }
    }
}

/// Integers beyond this magnitude are not all representable as `f64`.
const EXACT_INTEGER: i64 = 1 << 53;

/// The integer range allowed by the numeric bounds. Unbounded sides default
/// to a window of 100 starting at 3. Bounds outside of `i64` saturate.
fn integer_bounds(schema: &Schema) -> (i64, i64) {
    let lo = schema.minimum.map(|min| {
        if schema.exclusive_minimum {
            (min.floor() as i64).saturating_add(1)
        } else {
            min.ceil() as i64
        }
    });
    let hi = schema.maximum.map(|max| {
        if schema.exclusive_maximum {
            (max.ceil() as i64).saturating_sub(1)
        } else {
            max.floor() as i64
        }
    });

    let lo = lo.unwrap_or_else(|| hi.map(|hi| hi.min(3)).unwrap_or(3));
    let hi = hi.unwrap_or_else(|| lo.saturating_add(100));
    (lo, hi)
}

/// The smallest integral multiple of `divisor` at or above `lo`.
fn first_multiple(lo: i64, divisor: &Number) -> Option<i64> {
    let divisor = divisor.as_i64()?.checked_abs()?;
    if divisor == 0 {
        return None;
    }

    let rem = lo.rem_euclid(divisor);
    if rem == 0 {
        Some(lo)
    } else {
        lo.checked_add(divisor - rem)
    }
}

/// A number at fraction `t` of the way through the numeric bounds, or a
/// bound itself when the bounds leave no room in between.
fn number_between(schema: &Schema, t: f64) -> f64 {
    let room = |bound: f64| bound.abs().max(1.0);
    let (lo, hi) = match (schema.minimum, schema.maximum) {
        (Some(lo), Some(hi)) => (lo, hi),
        (Some(lo), None) => (lo, (lo + room(lo)).min(f64::MAX)),
        (None, Some(hi)) => ((hi - room(hi)).max(f64::MIN), hi),
        (None, None) => (3.0, 103.0),
    };

    // Weighted, so that neither the sum nor the difference overflows.
    let value = lo * (1.0 - t) + hi * t;
    if value > lo && value < hi {
        value
    } else if !schema.exclusive_minimum || !value.is_finite() {
        lo
    } else if !schema.exclusive_maximum {
        hi
    } else {
        value
    }
}

/// The lowest multiple of a (possibly fractional) divisor inside the numeric
/// bounds. Without a minimum, the highest multiple below the maximum.
fn number_multiple(schema: &Schema, divisor: f64) -> f64 {
    let divisor = divisor.abs();
    match (schema.minimum, schema.maximum) {
        (Some(min), _) => {
            let mut k = (min / divisor).ceil();
            if k * divisor < min || (schema.exclusive_minimum && k * divisor <= min) {
                k += 1.0;
            }
            k * divisor
        }
        (None, Some(max)) => {
            let mut k = (max / divisor).floor();
            if k * divisor > max || (schema.exclusive_maximum && k * divisor >= max) {
                k -= 1.0;
            }
            k * divisor
        }
        (None, None) => (3.0 / divisor).ceil() * divisor,
    }
}

/// Does the node's `type` name a schema, directly or inside a union?
fn has_schema_type(schema: &Schema) -> bool {
    match &schema.typ {
        TypeSpec::Single(member) => matches!(member, TypeRef::Schema(_)),
        TypeSpec::Union(members) => members.iter().any(|member| matches!(member, TypeRef::Schema(_))),
    }
}

/// Drop a leading `^` and a trailing unescaped `$`. A string matching the
/// rest in full also matches the anchored pattern.
fn unanchored(pattern: &str) -> &str {
    let pattern = pattern.strip_prefix('^').unwrap_or(pattern);
    match pattern.strip_suffix('$') {
        Some(rest) if !rest.ends_with('\\') => rest,
        _ => pattern,
    }
}

/// Layer the constraints of `members` into one schema, so that a value
/// generated from it is likely to satisfy all of them.
fn intersect(registry: &Registry, schema: &Schema, members: &[SchemaId]) -> Schema {
    let mut merged = schema.clone();
    merged.all_of = vec![];
    merged.any_of = vec![];
    merged.one_of = vec![];

    for member in members {
        let member = &registry[*member];

        if merged.typ.is_any() {
            merged.typ = member.typ.clone();
        } else if let (TypeSpec::Single(TypeRef::Named(a)), TypeSpec::Single(TypeRef::Named(b))) =
            (&merged.typ, &member.typ)
        {
            if *a == Type::Number && *b == Type::Integer {
                merged.typ = member.typ.clone();
            }
        }

        if let Some(min) = member.minimum {
            if merged.minimum.map(|current| min > current).unwrap_or(true) {
                merged.minimum = Some(min);
                merged.exclusive_minimum = member.exclusive_minimum;
            }
        }
        if let Some(max) = member.maximum {
            if merged.maximum.map(|current| max < current).unwrap_or(true) {
                merged.maximum = Some(max);
                merged.exclusive_maximum = member.exclusive_maximum;
            }
        }

        merged.min_length = max_of(merged.min_length, member.min_length);
        merged.max_length = min_of(merged.max_length, member.max_length);
        merged.min_items = max_of(merged.min_items, member.min_items);
        merged.max_items = min_of(merged.max_items, member.max_items);
        merged.unique_items |= member.unique_items;

        merged.divisible_by = merged.divisible_by.take().or_else(|| member.divisible_by.clone());
        merged.format = merged.format.or(member.format);
        merged.pattern = merged.pattern.take().or_else(|| member.pattern.clone());
        merged.enumeration = merged.enumeration.take().or_else(|| member.enumeration.clone());
        merged.example = merged.example.take().or_else(|| member.example.clone());
        if merged.disallow.is_none() {
            merged.disallow = member.disallow.clone();
        }

        for (name, property) in &member.properties {
            merged.properties.entry(name.clone()).or_insert(*property);
        }
        merged
            .pattern_properties
            .extend(member.pattern_properties.iter().cloned());
        if merged.additional_properties == Additional::Allowed(true) {
            merged.additional_properties = member.additional_properties;
        }
        for name in &member.required {
            if !merged.is_required(name) {
                merged.required.push(name.clone());
            }
        }

        if merged.items == Items::Absent {
            merged.items = member.items.clone();
            merged.additional_items = member.additional_items;
        }
    }

    merged
}

fn max_of(a: Option<u64>, b: Option<u64>) -> Option<u64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}

fn min_of(a: Option<u64>, b: Option<u64>) -> Option<u64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}
