use crate::registry::Registry;
use crate::schema::{Additional, Dependency, Items, Schema, SchemaId, Type, TypeRef, TypeSpec};
use crate::validator::{ValidationError, ValidationResult};
use serde_json::{Number, Value};
use std::collections::HashSet;

pub fn validate(registry: &Registry, schema: SchemaId, instance: &Value) -> ValidationResult {
    let mut vm = Vm {
        registry,
        instance_tokens: vec![],
        active: HashSet::new(),
    };

    let mut errors = vec![];
    let valid = vm.eval(schema, instance, &mut errors);
    ValidationResult::new(valid, errors)
}

/// Write the defaults of absent declared properties into `instance`,
/// wherever the governing node asks for it.
pub fn apply_defaults(registry: &Registry, schema: SchemaId, instance: &mut Value) {
    let mut active = HashSet::new();
    fill_defaults(registry, schema, instance, &mut active);
}

fn fill_defaults(
    registry: &Registry,
    id: SchemaId,
    instance: &mut Value,
    active: &mut HashSet<(SchemaId, usize)>,
) {
    let key = (id, instance as *const Value as usize);
    if !active.insert(key) {
        return;
    }

    let schema = &registry[id];
    if schema.options.sets_defaults() {
        if let Some(obj) = instance.as_object_mut() {
            for (name, property) in &schema.properties {
                if obj.contains_key(name) {
                    continue;
                }

                if let Some(default) = registry[*property].default_value() {
                    obj.insert(name.clone(), default.clone());
                }
            }
        }
    }

    for member in &schema.all_of {
        fill_defaults(registry, *member, instance, active);
    }

    if let TypeSpec::Single(TypeRef::Schema(member)) = &schema.typ {
        fill_defaults(registry, *member, instance, active);
    }

    match instance {
        Value::Object(obj) => {
            for (name, value) in obj.iter_mut() {
                if let Some(member) = schema.schema_for_member(name) {
                    fill_defaults(registry, member, value, active);
                }
            }
        }
        Value::Array(arr) => {
            for (index, value) in arr.iter_mut().enumerate() {
                if let Some(member) = schema.schema_for_item(index) {
                    fill_defaults(registry, member, value, active);
                }
            }
        }
        _ => {}
    }

    active.remove(&key);
}

struct Vm<'a> {
    registry: &'a Registry,
    instance_tokens: Vec<String>,
    /// (schema, instance) pairs currently being evaluated.
    active: HashSet<(SchemaId, *const Value)>,
}

impl<'a> Vm<'a> {
    fn eval(&mut self, id: SchemaId, instance: &Value, errors: &mut Vec<ValidationError>) -> bool {
        // A pair that is already being evaluated further up holds unless
        // something else fails.
        let key = (id, instance as *const Value);
        if !self.active.insert(key) {
            return true;
        }

        let registry = self.registry;
        let schema = &registry[id];

        let valid = self.check_type(schema, instance, errors)
            && self.check_all_of(schema, instance, errors)
            && self.check_any_of(schema, instance, errors)
            && self.check_one_of(schema, instance, errors)
            && self.check_disallow(schema, instance, errors)
            && self.check_number(schema, instance, errors)
            && self.check_required(schema, instance, errors)
            && self.check_properties(schema, instance, errors)
            && self.check_dependencies(schema, instance, errors)
            && self.check_array(schema, instance, errors)
            && self.check_string(schema, instance, errors)
            && self.check_enum(schema, instance, errors)
            && self.check_format(schema, instance, errors);

        self.active.remove(&key);
        valid
    }

    /// Evaluate without keeping any errors.
    fn eval_silent(&mut self, id: SchemaId, instance: &Value) -> bool {
        let mut scratch = vec![];
        self.eval(id, instance, &mut scratch)
    }

    fn check_type(
        &mut self,
        schema: &Schema,
        instance: &Value,
        errors: &mut Vec<ValidationError>,
    ) -> bool {
        match &schema.typ {
            TypeSpec::Single(member) => self.type_member(schema, *member, instance, false, Some(errors)),
            TypeSpec::Union(members) => {
                for member in members {
                    if self.type_member(schema, *member, instance, false, None) {
                        return true;
                    }
                }

                let message = format!(
                    "{} is not in type union [{}]",
                    Type::of(instance),
                    self.type_names(members)
                );
                self.push_err(errors, message);
                false
            }
        }
    }

    fn check_disallow(
        &mut self,
        schema: &Schema,
        instance: &Value,
        errors: &mut Vec<ValidationError>,
    ) -> bool {
        let disallow = match &schema.disallow {
            Some(disallow) => disallow,
            None => return true,
        };

        let members: &[TypeRef] = match disallow {
            TypeSpec::Single(member) => std::slice::from_ref(member),
            TypeSpec::Union(members) => members,
        };

        let matched = members
            .iter()
            .any(|member| self.type_member(schema, *member, instance, true, None));

        if matched {
            self.push_err(errors, "Value matches disallowed type.".to_owned());
        }
        !matched
    }

    /// Does `instance` match one `type`/`disallow` member? Errors are only
    /// reported when `errors` is given. `strict` disables the null-enum
    /// allowance.
    fn type_member(
        &mut self,
        schema: &Schema,
        member: TypeRef,
        instance: &Value,
        strict: bool,
        errors: Option<&mut Vec<ValidationError>>,
    ) -> bool {
        match member {
            TypeRef::Schema(id) => match errors {
                Some(errors) => self.eval(id, instance, errors),
                None => self.eval_silent(id, instance),
            },
            TypeRef::Named(typ) => {
                if !strict && instance.is_null() && schema.enum_permits_null() {
                    return true;
                }

                if typ.matches(instance) {
                    return true;
                }

                if let Some(errors) = errors {
                    let message = format!("{} found where '{}' is required.", Type::of(instance), typ);
                    self.push_err(errors, message);
                }
                false
            }
        }
    }

    fn check_all_of(
        &mut self,
        schema: &Schema,
        instance: &Value,
        errors: &mut Vec<ValidationError>,
    ) -> bool {
        let failed: Vec<SchemaId> = schema
            .all_of
            .iter()
            .copied()
            .filter(|member| !self.eval_silent(*member, instance))
            .collect();

        if failed.is_empty() {
            return true;
        }

        let message = format!(
            "Value failed validation against the following schemas [{}]. It must match them all.",
            self.schema_names(&failed)
        );
        self.push_err(errors, message);
        false
    }

    fn check_any_of(
        &mut self,
        schema: &Schema,
        instance: &Value,
        errors: &mut Vec<ValidationError>,
    ) -> bool {
        if schema.any_of.is_empty() {
            return true;
        }

        for member in &schema.any_of {
            if self.eval_silent(*member, instance) {
                return true;
            }
        }

        let message = format!(
            "Value did not match any of the schemas in [{}]. It must match at least one.",
            self.schema_names(&schema.any_of)
        );
        self.push_err(errors, message);
        false
    }

    fn check_one_of(
        &mut self,
        schema: &Schema,
        instance: &Value,
        errors: &mut Vec<ValidationError>,
    ) -> bool {
        if schema.one_of.is_empty() {
            return true;
        }

        let matched: Vec<SchemaId> = schema
            .one_of
            .iter()
            .copied()
            .filter(|member| self.eval_silent(*member, instance))
            .collect();

        let message = match matched.len() {
            1 => return true,
            0 => format!(
                "Value did not match any of the schemas in [{}]. It must match exactly one.",
                self.schema_names(&schema.one_of)
            ),
            _ => format!(
                "Value matched the following schemas [{}]. It must match exactly one.",
                self.schema_names(&matched)
            ),
        };
        self.push_err(errors, message);
        false
    }

    fn check_number(
        &mut self,
        schema: &Schema,
        instance: &Value,
        errors: &mut Vec<ValidationError>,
    ) -> bool {
        let number = match instance {
            Value::Number(number) => number,
            _ => return true,
        };

        match number_violation(schema, number) {
            Some(message) => {
                self.push_err(errors, message);
                false
            }
            None => true,
        }
    }

    fn check_required(
        &mut self,
        schema: &Schema,
        instance: &Value,
        errors: &mut Vec<ValidationError>,
    ) -> bool {
        let obj = match instance.as_object() {
            Some(obj) => obj,
            None => return true,
        };

        let mut valid = true;
        for name in &schema.required {
            if obj.contains_key(name) {
                continue;
            }

            let read_only = schema
                .property(name)
                .map(|property| self.registry[property].read_only)
                .unwrap_or(false);

            if !(read_only && schema.options.allows_missing_read_only()) {
                self.push_err(errors, format!("Property '{}' is required and is not present.", name));
                valid = false;
            }
        }

        valid
    }

    fn check_properties(
        &mut self,
        schema: &Schema,
        instance: &Value,
        errors: &mut Vec<ValidationError>,
    ) -> bool {
        let obj = match instance.as_object() {
            Some(obj) => obj,
            None => return true,
        };

        let mut valid = true;
        for (name, value) in obj {
            match schema.schema_for_member(name) {
                Some(member) => {
                    self.push_instance_token(name);
                    valid &= self.eval(member, value, errors);
                    self.pop_instance_token();
                }
                None => {
                    if schema.additional_properties == Additional::Allowed(false) {
                        let allowed: Vec<&str> = schema.properties.keys().map(String::as_str).collect();
                        self.push_err(
                            errors,
                            format!(
                                "The property '{}' is not defined in the object schema and additional properties are disallowed. Allowed properties are {}",
                                name,
                                allowed.join(", ")
                            ),
                        );
                        valid = false;
                    }
                }
            }
        }

        if obj.contains_key("expandable") && obj.get("required").map(is_truthy).unwrap_or(false) {
            self.push_err(
                errors,
                "The object is marked as expandable and required. If an object is expandable it cannot be required."
                    .to_owned(),
            );
            valid = false;
        }

        valid
    }

    fn check_dependencies(
        &mut self,
        schema: &Schema,
        instance: &Value,
        errors: &mut Vec<ValidationError>,
    ) -> bool {
        let obj = match instance.as_object() {
            Some(obj) => obj,
            None => return true,
        };

        let mut valid = true;
        for (dependent, dependency) in &schema.dependencies {
            if !obj.contains_key(dependent) {
                continue;
            }

            let names: &[String] = match dependency {
                Dependency::Name(name) => std::slice::from_ref(name),
                Dependency::Names(names) => names,
                Dependency::Schema(id) => {
                    self.push_instance_token(&format!("dependencies.{}", dependent));
                    valid &= self.eval(*id, instance, errors);
                    self.pop_instance_token();
                    continue;
                }
            };

            for name in names {
                if !obj.contains_key(name) {
                    self.push_err(
                        errors,
                        format!(
                            "Dependent property {} requires that property {} is present.",
                            dependent, name
                        ),
                    );
                    valid = false;
                }
            }
        }

        valid
    }

    fn check_array(
        &mut self,
        schema: &Schema,
        instance: &Value,
        errors: &mut Vec<ValidationError>,
    ) -> bool {
        let arr = match instance.as_array() {
            Some(arr) => arr,
            None => return true,
        };

        let len = arr.len() as u64;
        if let Some(min) = schema.min_items {
            if len < min {
                self.push_err(errors, format!("Array contains {} items, minimum is {}.", len, min));
                return false;
            }
        }

        if let Some(max) = schema.max_items {
            if len > max {
                self.push_err(errors, format!("Array contains {} items, maximum is {}.", len, max));
                return false;
            }
        }

        if schema.unique_items && has_duplicates(arr) {
            self.push_err(errors, "Array items are not unique.".to_owned());
            return false;
        }

        match &schema.items {
            Items::Absent => true,
            Items::Single(id) => self.check_elements(arr.iter().enumerate(), *id, errors),
            Items::Tuple(ids) => {
                if schema.additional_items == Additional::Allowed(false) && arr.len() > ids.len() {
                    self.push_err(
                        errors,
                        "Array contains more items than are permitted by type tuple, and additional items are disallowed."
                            .to_owned(),
                    );
                    return false;
                }

                for (index, (id, value)) in ids.iter().zip(arr).enumerate() {
                    self.push_instance_token(&index.to_string());
                    let valid = self.eval(*id, value, errors);
                    self.pop_instance_token();

                    if !valid {
                        return false;
                    }
                }

                match schema.additional_items {
                    Additional::Constrained(id) => {
                        self.check_elements(arr.iter().enumerate().skip(ids.len()), id, errors)
                    }
                    Additional::Allowed(_) => true,
                }
            }
        }
    }

    /// Check elements against one schema, stopping at the first failure.
    fn check_elements<'v>(
        &mut self,
        elements: impl Iterator<Item = (usize, &'v Value)>,
        id: SchemaId,
        errors: &mut Vec<ValidationError>,
    ) -> bool {
        for (index, value) in elements {
            self.push_instance_token(&index.to_string());
            let valid = self.eval(id, value, errors);
            self.pop_instance_token();

            if !valid {
                return false;
            }
        }

        true
    }

    fn check_string(
        &mut self,
        schema: &Schema,
        instance: &Value,
        errors: &mut Vec<ValidationError>,
    ) -> bool {
        let string = match instance.as_str() {
            Some(string) => string,
            None => return true,
        };

        let len = string.len() as u64;
        if let Some(min) = schema.min_length {
            if len < min {
                self.push_err(
                    errors,
                    format!("String length of {} does not meet minimum length of {}.", len, min),
                );
                return false;
            }
        }

        if let Some(max) = schema.max_length {
            if len > max {
                self.push_err(
                    errors,
                    format!("String length of {} exceeds maximum length of {}.", len, max),
                );
                return false;
            }
        }

        if let Some(pattern) = &schema.pattern {
            if !pattern.is_match(string) {
                self.push_err(
                    errors,
                    format!(
                        "String '{}' does not match regular expression pattern '{}'.",
                        string,
                        pattern.as_str()
                    ),
                );
                return false;
            }
        }

        true
    }

    fn check_enum(
        &mut self,
        schema: &Schema,
        instance: &Value,
        errors: &mut Vec<ValidationError>,
    ) -> bool {
        match &schema.enumeration {
            Some(values) if !values.contains(instance) => {
                self.push_err(errors, "Value is not present in the enumeration.".to_owned());
                false
            }
            _ => true,
        }
    }

    fn check_format(
        &mut self,
        schema: &Schema,
        instance: &Value,
        errors: &mut Vec<ValidationError>,
    ) -> bool {
        match (schema.format, instance.as_str()) {
            (Some(format), Some(string)) if !format.matches(string) => {
                self.push_err(errors, format!("Value does not match format '{}'.", format));
                false
            }
            _ => true,
        }
    }

    fn type_names(&self, members: &[TypeRef]) -> String {
        members
            .iter()
            .map(|member| match member {
                TypeRef::Named(typ) => typ.name().to_owned(),
                TypeRef::Schema(id) => self.registry[*id].display_name(),
            })
            .collect::<Vec<_>>()
            .join(",")
    }

    fn schema_names(&self, ids: &[SchemaId]) -> String {
        ids.iter()
            .map(|id| self.registry[*id].display_name())
            .collect::<Vec<_>>()
            .join(",")
    }

    fn push_instance_token(&mut self, token: &str) {
        self.instance_tokens.push(token.to_owned());
    }

    fn pop_instance_token(&mut self) {
        self.instance_tokens.pop();
    }

    fn push_err(&self, errors: &mut Vec<ValidationError>, message: String) {
        errors.push(ValidationError::new(self.instance_tokens.clone(), message));
    }
}

/// The first numeric constraint `number` violates, as an error message.
pub(crate) fn number_violation(schema: &Schema, number: &Number) -> Option<String> {
    let value = number.as_f64().unwrap_or(0.0);

    if let Some(minimum) = schema.minimum {
        if value < minimum || (schema.exclusive_minimum && value == minimum) {
            let exclusive = if schema.exclusive_minimum { " exclusive" } else { "" };
            return Some(format!(
                "Value of {} does not meet{} minimum of {}.",
                number, exclusive, minimum
            ));
        }
    }

    if let Some(maximum) = schema.maximum {
        if value > maximum || (schema.exclusive_maximum && value == maximum) {
            let exclusive = if schema.exclusive_maximum { " exclusive" } else { "" };
            return Some(format!(
                "Value of {} exceeds{} maximum of {}.",
                number, exclusive, maximum
            ));
        }
    }

    if let Some(divisor) = &schema.divisible_by {
        if !is_divisible(number, divisor) {
            return Some(format!("Value is not divisibleBy {}.", divisor));
        }
    }

    None
}

pub(crate) fn is_divisible(number: &Number, divisor: &Number) -> bool {
    if let (Some(n), Some(d)) = (number.as_i64(), divisor.as_i64()) {
        // Only i64::MIN / -1 overflows, and it divides evenly.
        return d != 0 && n.checked_rem(d).map_or(true, |r| r == 0);
    }

    if let (Some(n), Some(d)) = (number.as_u64(), divisor.as_u64()) {
        return d != 0 && n % d == 0;
    }

    match (number.as_f64(), divisor.as_f64()) {
        (Some(n), Some(d)) if d != 0.0 => {
            let quotient = n / d;
            (quotient - quotient.round()).abs() < 1e-9
        }
        _ => false,
    }
}

fn has_duplicates(items: &[Value]) -> bool {
    items
        .iter()
        .enumerate()
        .any(|(i, item)| items[i + 1..].contains(item))
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|n| n != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty() && s != "0",
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn divisibility() {
        let n = |v: Value| match v {
            Value::Number(n) => n,
            _ => unreachable!(),
        };

        assert!(is_divisible(&n(json!(10)), &n(json!(5))));
        assert!(!is_divisible(&n(json!(10)), &n(json!(3))));
        assert!(is_divisible(&n(json!(-9)), &n(json!(3))));
        assert!(is_divisible(&n(json!(0.3)), &n(json!(0.1))));
        assert!(is_divisible(&n(json!(7.5)), &n(json!(2.5))));
        assert!(!is_divisible(&n(json!(7.4)), &n(json!(2.5))));
        assert!(is_divisible(&n(json!(u64::max_value())), &n(json!(u64::max_value()))));
        assert!(is_divisible(&n(json!(i64::min_value())), &n(json!(-1))));
        assert!(is_divisible(&n(json!(i64::min_value())), &n(json!(-2))));
        assert!(!is_divisible(&n(json!(i64::min_value() + 1)), &n(json!(-2))));
    }

    #[test]
    fn duplicates_are_exact() {
        assert!(has_duplicates(&[json!("1"), json!("1"), json!({"foo": "bar"})]));
        assert!(!has_duplicates(&[json!(""), Value::Null, json!({"foo": "bar"})]));
        assert!(!has_duplicates(&[json!(1), json!(1.0)]));
        assert!(has_duplicates(&[json!({"a": 1, "b": 2}), json!({"b": 2, "a": 1})]));
    }

    #[test]
    fn truthiness() {
        assert!(is_truthy(&json!(true)));
        assert!(is_truthy(&json!(1)));
        assert!(is_truthy(&json!("yes")));
        assert!(!is_truthy(&json!(false)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("0")));
        assert!(!is_truthy(&json!([1])));
    }
}
