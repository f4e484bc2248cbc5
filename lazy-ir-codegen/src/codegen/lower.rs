use crate::config::GenConfig;
use crate::error::{Error, GenResult};
use crate::lowering::LoweringBody;
use crate::schema::{LazyArg, NativeFunction, ValueCType};
use crate::signature::KernelSignature;

use super::plan::*;
use super::shape::ShapeStrategy;
use super::symbol::SymbolTable;
use super::value_expr::ValueExprWriter;

/**
 * Lower a function into the plan of its IR node class.
 */
pub fn lower_node_class(
    func: &NativeFunction,
    cfg: &GenConfig,
    lowering: &dyn LoweringBody,
) -> NodeClassPlan {
    let schema = &func.schema;
    let symbols = SymbolTable::new(&cfg.missing_interned_symbols);

    let ctor_params = schema
        .filtered_types()
        .iter()
        .map(|a| format!("const {}& {}", a.cpp_type(), a.name()))
        .collect();

    let mut base_values = Vec::new();
    let mut optional_values = Vec::new();
    for (name, ty) in schema.value_types() {
        match ty {
            ValueCType::Plain => base_values.push(name.to_string()),
            ValueCType::Optional => {
                base_values.push(format!("{name}.value_or(kNullValue)"));
                optional_values.push(name.to_string());
            }
        }
    }

    let scalar_fields = schema
        .scalar_types()
        .map(|(name, ty)| ScalarField {
            name: name.to_string(),
            cpp_type: ty.cpp_type(),
            optional: ty.is_optional(),
        })
        .collect();

    NodeClassPlan {
        node_name: schema.node_name().to_string(),
        node_base: cfg.node_base.clone(),
        op_symbol: symbols.aten_symbol(schema.aten_name()),
        ctor_params,
        base_values,
        num_outputs: schema.returns().len(),
        scalar_fields,
        optional_values,
        lowering_signature: lowering.signature(),
        lowering_body: lowering.body(func),
    }
}

/**
 * Lower a function into the plan of its dispatch kernel.
 */
pub fn lower_dispatch(
    func: &NativeFunction,
    cfg: &GenConfig,
    signature: &dyn KernelSignature,
) -> GenResult<DispatchPlan> {
    let schema = &func.schema;
    let op = schema.name().to_string();
    let writer = ValueExprWriter::new(schema);
    let symbols = SymbolTable::new(&cfg.missing_interned_symbols);

    let first = schema
        .tensor_values()
        .next()
        .map(|(name, _)| name.to_string())
        .ok_or_else(|| Error::MissingValueArgument { op: op.clone() })?;

    let returns = schema.returns().len();
    if schema.is_inplace() && returns != 1 {
        return Err(Error::InplaceArity { op, returns });
    }
    if returns == 0 {
        return Err(Error::MissingReturn { op });
    }

    let qualified = format!("{}::{}", cfg.class_method_name, schema.aten_name());
    let decl = signature.decl(func, &cfg.backend_index, &qualified);

    let device_args = schema
        .tensor_values()
        .map(|(name, _)| name.to_string())
        .collect();

    let tensor_decls = schema
        .tensor_values()
        .map(|(name, ty)| match ty {
            ValueCType::Plain => TensorDecl::Plain {
                name: name.to_string(),
            },
            ValueCType::Optional => TensorDecl::Optional {
                name: name.to_string(),
            },
        })
        .collect();

    let mut node_hash_inputs = vec![format!(
        "static_cast<uint32_t>({})",
        symbols.aten_symbol(schema.aten_name())
    )];
    node_hash_inputs.extend(schema.scalar_types().map(|(name, _)| name.to_string()));

    let dag_hash_inputs = schema
        .tensor_values()
        .map(|(name, ty)| writer.ir_value(name, ty))
        .collect();

    let ctor_args = schema
        .filtered_types()
        .iter()
        .map(|a: &LazyArg| writer.ctor_arg(a))
        .collect();

    let bridge = if schema.is_inplace() {
        Bridge::InPlace { first }
    } else if returns > 1 {
        Bridge::Tuple {
            first,
            count: returns,
        }
    } else {
        Bridge::Single { first }
    };

    log::debug!("lowered dispatch for {op} ({returns} returns)");

    Ok(DispatchPlan {
        decl,
        device_args,
        tensor_class: cfg.tensor_class.clone(),
        tensor_decls,
        node_hash_inputs,
        dag_hash_inputs,
        shapes: ShapeStrategy::for_function(func, signature),
        returns,
        node_name: schema.node_name().to_string(),
        ctor_args,
        bridge,
    })
}
