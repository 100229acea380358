//! Oracle functions: callables whose behavior is synthesized at call time
//! by an LLM backend, constrained by schemas derived from the declared
//! types and validated few-shot examples.

use crate::ast::{FunctionDef, TypeExpr};
use crate::bnf;
use crate::interpreter::{EvalResult, Interpreter, Interrupt};
use crate::printer;
use crate::schema;
use crate::tokens::{Literal, Token, TokenKind};
use crate::values::{FunctionKind, FunctionValue, MObject, MType, MValue, OracleSpec, Value};
use indexmap::{IndexMap, IndexSet};
use std::cell::RefCell;
use std::rc::Rc;

const HEADER: &str = "
You are a helpful assistant, and your task is to provide answers
respecting the formatting instructions. Only output a JSON, with
no ``` delimiters!

INPUT JSON SCHEMA:

{input_schema}

OUTPUT JSON SCHEMA:

{output_schema}
";

const EXAMPLE: &str = "
TASK:

{task}

INPUT:

{input}

OUTPUT:

{output}
";

const QUERY: &str = "
TASK:

{task}

INPUT:

{input}

OUTPUT:

";

const DEFAULT_TASK: &str = "Determine the output from the input.";

/// Wrap a return type into the object-shaped root some backends require:
/// `{"result": <T>}` with `result` mandatory.
fn result_wrapped(outtype: &MType) -> MType {
    let mut map = IndexMap::new();
    map.insert("result".to_string(), Rc::clone(&outtype.definition));
    let mut required = IndexSet::new();
    required.insert("result".to_string());
    MType::new(
        Rc::new(TypeExpr::Map {
            map,
            required,
            annotation: None,
        }),
        Rc::clone(&outtype.env),
    )
}

/// Construct an oracle function value: derive the input/output schemas and
/// the output grammar, validate the examples, and widen the return type to
/// optional so a failed consultation stays expressible.
pub fn build(
    ip: &mut Interpreter,
    definition: Rc<FunctionDef>,
    examples: MObject,
) -> Result<Rc<FunctionValue>, Interrupt> {
    let closure = Rc::clone(&ip.env);
    let operator = definition.operator.clone();
    let (intypes, outtype) =
        FunctionValue::split_types(&definition.types, definition.parameters.len(), &closure);

    // Input schema: a synthetic map of parameter names to parameter types,
    // every parameter required.
    let mut map = IndexMap::new();
    let mut required = IndexSet::new();
    for (param, ptype) in definition.parameters.iter().zip(&intypes) {
        map.insert(param.text().to_string(), Rc::clone(&ptype.definition));
        required.insert(param.text().to_string());
    }
    let in_types = MType::new(
        Rc::new(TypeExpr::Map {
            map,
            required,
            annotation: definition.types.annotation().map(str::to_string),
        }),
        Rc::clone(&closure),
    );
    let input_schema =
        schema::print_schema(&in_types).map_err(|e| ip.error(&operator, &e.to_string()))?;

    let wrapped = result_wrapped(&outtype);
    let output_schema =
        schema::dict_schema(&wrapped).map_err(|e| ip.error(&operator, &e.to_string()))?;
    let output_grammar = bnf::format(&wrapped).map_err(|e| ip.error(&operator, &e.to_string()))?;

    validate_examples(ip, &operator, &definition, &intypes, &outtype, &examples)?;

    // Widen the declared return type so error-annotated nulls type-check.
    let outtype = if matches!(outtype.definition.as_ref(), TypeExpr::Unary { .. })
        || outtype.definition.is_any()
    {
        outtype
    } else {
        let question = Token::new(
            TokenKind::Question,
            Some(Literal::Str("?".to_string())),
            Rc::clone(&operator.buffer),
            operator.index,
        );
        MType::new(
            Rc::new(TypeExpr::Unary {
                operator: question,
                expr: Rc::clone(&outtype.definition),
                annotation: None,
            }),
            Rc::clone(&outtype.env),
        )
    };

    let annotation = definition.types.annotation().map(Rc::from);
    Ok(Rc::new(FunctionValue {
        definition,
        closure,
        intypes,
        outtype,
        annotation: RefCell::new(annotation),
        kind: FunctionKind::Oracle(OracleSpec {
            input_schema,
            output_schema,
            output_grammar,
            examples,
        }),
    }))
}

fn validate_examples(
    ip: &mut Interpreter,
    operator: &Token,
    definition: &FunctionDef,
    intypes: &[MType],
    outtype: &MType,
    examples: &MObject,
) -> Result<(), Interrupt> {
    let MObject::Value(MValue {
        value: Value::Array(rows),
        ..
    }) = examples
    else {
        return Err(ip.error(operator, "The examples must be of type [[Any]]."));
    };

    let length = definition.parameters.len() + 1;
    for row in rows.borrow().iter() {
        let MObject::Value(MValue {
            value: Value::Array(fields),
            ..
        }) = row
        else {
            return Err(ip.error(
                operator,
                &format!(
                    "Each example must be an array of length {}, but found {}.",
                    length,
                    printer::print(row)
                ),
            ));
        };
        let fields = fields.borrow();
        if fields.len() != length {
            return Err(ip.error(
                operator,
                &format!(
                    "Each example must be an array of length {}, but found {}.",
                    length,
                    printer::print(row)
                ),
            ));
        }

        for (field, ptype) in fields.iter().zip(intypes) {
            let ok = crate::types::checktype(field, ptype)
                .map_err(|e| ip.error(operator, &e.0))?;
            if !ok {
                return Err(ip.error(
                    operator,
                    &format!(
                        "Expected value of type '{}' but found: {}.",
                        printer::print(&MObject::Type(ptype.clone())),
                        printer::print(field)
                    ),
                ));
            }
        }

        let output = &fields[length - 1];
        let ok =
            crate::types::checktype(output, outtype).map_err(|e| ip.error(operator, &e.0))?;
        if !ok {
            return Err(ip.error(
                operator,
                &format!(
                    "Expected output value of type '{}' but found: {}.",
                    printer::print(&MObject::Type(outtype.clone())),
                    printer::print(output)
                ),
            ));
        }
    }
    Ok(())
}

fn render_input(definition: &FunctionDef, args: &[MObject]) -> String {
    let mut data = IndexMap::new();
    for (param, arg) in definition.parameters.iter().zip(args) {
        data.insert(param.text().to_string(), arg.clone());
    }
    printer::print(&MObject::map(data))
}

fn render_examples(func: &FunctionValue, spec: &OracleSpec, task: &str) -> String {
    let MObject::Value(MValue {
        value: Value::Array(rows),
        ..
    }) = &spec.examples
    else {
        return String::new();
    };
    let mut body = String::new();
    for row in rows.borrow().iter() {
        let MObject::Value(MValue {
            value: Value::Array(fields),
            ..
        }) = row
        else {
            continue;
        };
        let fields = fields.borrow();
        if fields.is_empty() {
            continue;
        }
        let input = render_input(&func.definition, &fields[..fields.len() - 1]);
        let output = printer::print(&fields[fields.len() - 1]);
        body.push_str(
            &EXAMPLE
                .replace("{task}", task)
                .replace("{input}", &input)
                .replace("{output}", &output),
        );
    }
    body
}

/// One oracle call: assemble the prompt, consult the backend, evaluate the
/// reply and extract its `result` member. Every failure mode degrades to
/// an error-annotated null.
pub fn consult(
    ip: &mut Interpreter,
    func: &Rc<FunctionValue>,
    spec: &OracleSpec,
    args: Vec<MObject>,
) -> EvalResult {
    let task = func
        .annotation
        .borrow()
        .as_deref()
        .unwrap_or(DEFAULT_TASK)
        .to_string();
    let input = render_input(&func.definition, &args);
    let output_schema_text =
        serde_json::to_string(&spec.output_schema).unwrap_or_else(|_| "{}".to_string());

    let mut prompt = HEADER
        .replace("{input_schema}", &spec.input_schema)
        .replace("{output_schema}", &output_schema_text);
    prompt.push_str(&render_examples(func, spec, &task));
    prompt.push_str(
        &QUERY
            .replace("{task}", &task)
            .replace("{input}", &input),
    );

    let backend = Rc::clone(&ip.backend);
    let code = match backend.consult(&prompt, Some(&spec.output_grammar), Some(&spec.output_schema))
    {
        Ok(code) => code,
        Err(e) => return Ok(MObject::annotated_null(&e.to_string())),
    };

    // The reply is expected to parse as a MindScript (strict JSON)
    // expression of the form {"result": ...}.
    let current_buffer = ip.buffer().to_string();
    let outcome = ip.eval(&code, Some("<oracle>"));
    ip.set_buffer(&current_buffer);

    let value = match outcome {
        Ok(value) => value,
        Err(Interrupt::Error(diagnostics)) => {
            let message = diagnostics
                .first()
                .map(|d| d.message.clone())
                .unwrap_or_else(|| "Malformed oracle response.".to_string());
            return Ok(MObject::annotated_null(&message));
        }
        Err(Interrupt::Incomplete) => {
            return Ok(MObject::annotated_null("Malformed oracle response."))
        }
        Err(other) => return Err(other),
    };

    if let MObject::Value(MValue {
        value: Value::Map(entries),
        ..
    }) = &value
    {
        if let Some(result) = entries.borrow().get("result") {
            return Ok(result.clone());
        }
    }
    Ok(MObject::annotated_null(
        "Malformed oracle response: expected an object with a 'result' member.",
    ))
}
