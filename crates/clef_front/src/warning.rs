//! The configurable warning set.
//!
//! Each field corresponds to one `-w` flag of the driver; `-w no-NAME`
//! clears it.  Unknown names are rejected so typos surface at CLI
//! parse time rather than silently enabling nothing.

/// Which optional warnings the analyzer emits.
#[derive(Debug, Clone)]
pub struct Warnings {
    pub char_subscripts: bool,
    pub empty_statement: bool,
    pub float_equal: bool,
    pub format: bool,
    pub implicit_function_declaration: bool,
    pub implicit_int: bool,
    pub main: bool,
    pub missing_declarations: bool,
    pub missing_prototypes: bool,
    pub redundant_decls: bool,
    pub sign_compare: bool,
    pub strict_prototypes: bool,
    pub switch_default: bool,
    pub unused_function: bool,
    pub unused_label: bool,
    pub unused_parameter: bool,
    pub unused_value: bool,
    pub unused_variable: bool,
}

impl Default for Warnings {
    fn default() -> Self {
        Warnings {
            char_subscripts: true,
            empty_statement: false,
            float_equal: false,
            format: true,
            implicit_function_declaration: true,
            implicit_int: true,
            main: true,
            missing_declarations: false,
            missing_prototypes: false,
            redundant_decls: false,
            sign_compare: false,
            strict_prototypes: false,
            switch_default: false,
            unused_function: false,
            unused_label: true,
            unused_parameter: false,
            unused_value: true,
            unused_variable: false,
        }
    }
}

impl Warnings {
    /// Applies one warning flag, e.g. `sign-compare` or
    /// `no-sign-compare`.  Returns the unknown name on failure.
    pub fn apply(&mut self, flag: &str) -> Result<(), String> {
        let (name, value) = match flag.strip_prefix("no-") {
            Some(rest) => (rest, false),
            None => (flag, true),
        };
        match name {
            "char-subscripts" => self.char_subscripts = value,
            "empty-statement" => self.empty_statement = value,
            "float-equal" => self.float_equal = value,
            "format" => self.format = value,
            "implicit-function-declaration" => self.implicit_function_declaration = value,
            "implicit-int" => self.implicit_int = value,
            "main" => self.main = value,
            "missing-declarations" => self.missing_declarations = value,
            "missing-prototypes" => self.missing_prototypes = value,
            "redundant-decls" => self.redundant_decls = value,
            "sign-compare" => self.sign_compare = value,
            "strict-prototypes" => self.strict_prototypes = value,
            "switch-default" => self.switch_default = value,
            "unused" => {
                self.unused_function = value;
                self.unused_label = value;
                self.unused_parameter = value;
                self.unused_value = value;
                self.unused_variable = value;
            }
            "unused-function" => self.unused_function = value,
            "unused-label" => self.unused_label = value,
            "unused-parameter" => self.unused_parameter = value,
            "unused-value" => self.unused_value = value,
            "unused-variable" => self.unused_variable = value,
            "all" => {
                self.char_subscripts = value;
                self.format = value;
                self.implicit_function_declaration = value;
                self.implicit_int = value;
                self.main = value;
                self.redundant_decls = value;
                self.sign_compare = value;
                self.strict_prototypes = value;
                self.switch_default = value;
                self.unused_label = value;
                self.unused_value = value;
            }
            unknown => return Err(unknown.to_string()),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_toggle_on_and_off() {
        let mut warnings = Warnings::default();
        assert!(!warnings.sign_compare);
        warnings.apply("sign-compare").unwrap();
        assert!(warnings.sign_compare);
        warnings.apply("no-sign-compare").unwrap();
        assert!(!warnings.sign_compare);
    }

    #[test]
    fn unknown_flags_are_rejected() {
        let mut warnings = Warnings::default();
        assert_eq!(
            warnings.apply("sign-compar"),
            Err("sign-compar".to_string())
        );
    }

    #[test]
    fn unused_is_a_group_flag() {
        let mut warnings = Warnings::default();
        warnings.apply("unused").unwrap();
        assert!(warnings.unused_function);
        assert!(warnings.unused_parameter);
        warnings.apply("no-unused").unwrap();
        assert!(!warnings.unused_label);
    }
}
