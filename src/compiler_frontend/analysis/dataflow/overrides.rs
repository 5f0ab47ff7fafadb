use crate::compiler_frontend::analysis::dataflow::DataflowAnalyzer;
use crate::compiler_frontend::schema::schema_nodes::FunctionId;

impl DataflowAnalyzer<'_> {
    /// Links every function record to its override tree and makes the members of each
    /// tree agree on which arguments and return values can carry X/Z or need a
    /// stateful string. A call through the root can land in any member.
    pub(super) fn resolve_overrides(&mut self) {
        let schema = self.schema;

        for function in &schema.functions {
            let record = self.table.ensure_function(schema, function.id);
            record.overrides = function.overrides;
            record.overridden_by = self
                .overridden_by
                .get(&function.id)
                .cloned()
                .unwrap_or_default();
        }

        for function in &schema.functions {
            if function.overrides.is_none() {
                self.resolve_override_tree(function.id);
            }
        }
    }

    fn resolve_override_tree(&mut self, root: FunctionId) {
        let schema = self.schema;
        let family = self.override_family(root);
        let param_count = schema.function(root).params.len();

        for member in &family {
            assert_eq!(
                schema.function(*member).params.len(),
                param_count,
                "inconsistent argument counts between {} and its override {}",
                self.function_name(root),
                self.function_name(*member),
            );
        }

        // Children first, so the root ends up holding the union of the whole tree
        let mut argument_xz = vec![false; param_count];
        let mut argument_stateful = vec![false; param_count];
        let mut return_xz = false;

        for member in family.iter().rev() {
            let decl = schema.function(*member);
            for (index, param) in decl.params.iter().enumerate() {
                let record = self.table.ensure_variable(schema, *param);
                argument_xz[index] |= record.can_be_xz();
                argument_stateful[index] |= record.needs_stateful_string;
            }
            if let Some(return_var) = decl.return_var {
                return_xz |= self.table.ensure_variable(schema, return_var).can_be_xz();
            }
        }

        for member in &family {
            let record = self.table.ensure_function(schema, *member);
            record.argument_xz_in_override.clone_from(&argument_xz);
            record.argument_stateful_in_override.clone_from(&argument_stateful);
            record.return_xz_in_override = return_xz;
        }

        for member in &family {
            let overridden = self
                .overridden_by
                .get(member)
                .is_some_and(|children| !children.is_empty());
            if !overridden
                || schema.function(*member).is_virtual
                || self.has_virtual_ancestor(*member)
            {
                continue;
            }

            self.table
                .ensure_function(schema, *member)
                .non_virtual_but_overridden = true;
            self.log.line(format!(
                "Warning: {} is overridden but is not virtual",
                self.function_name(*member)
            ));
        }
    }

    fn has_virtual_ancestor(&self, function: FunctionId) -> bool {
        let mut current = self.schema.function(function).overrides;
        while let Some(ancestor) = current {
            let decl = self.schema.function(ancestor);
            if decl.is_virtual {
                return true;
            }
            current = decl.overrides;
        }
        false
    }
}
