//! Clock and randomness natives.

use super::define_native;
use crate::interpreter::{Interpreter, Interrupt};
use crate::tokens::Token;
use crate::values::MObject;
use chrono::{Datelike, Local, Timelike, Utc};
use indexmap::IndexMap;
use rand::Rng;

type NativeResult = Result<MObject, Interrupt>;

fn ts_now(_ip: &mut Interpreter, _op: &Token, _args: Vec<MObject>) -> NativeResult {
    Ok(MObject::int(Utc::now().timestamp_millis()))
}

fn date_now(_ip: &mut Interpreter, _op: &Token, _args: Vec<MObject>) -> NativeResult {
    let now = Local::now();
    let mut date = IndexMap::new();
    date.insert("year".to_string(), MObject::int(now.year() as i64));
    date.insert("month".to_string(), MObject::int(now.month() as i64));
    date.insert("day".to_string(), MObject::int(now.day() as i64));
    date.insert("hour".to_string(), MObject::int(now.hour() as i64));
    date.insert("minute".to_string(), MObject::int(now.minute() as i64));
    date.insert("second".to_string(), MObject::int(now.second() as i64));
    date.insert(
        "millisecond".to_string(),
        MObject::int((now.nanosecond() / 1_000_000) as i64),
    );
    Ok(MObject::map(date))
}

fn random(_ip: &mut Interpreter, _op: &Token, _args: Vec<MObject>) -> NativeResult {
    Ok(MObject::num(rand::thread_rng().gen::<f64>()))
}

pub fn register(ip: &mut Interpreter) -> Result<(), Interrupt> {
    define_native(
        ip,
        "tsNow",
        "fun(_: Null) -> Int",
        "Returns the current timestamp in milliseconds.",
        Box::new(ts_now),
    )?;
    define_native(
        ip,
        "dateNow",
        "fun(_: Null) -> {}",
        "Returns the current date.",
        Box::new(date_now),
    )?;
    define_native(
        ip,
        "random",
        "fun(_: Null) -> Num",
        "Returns a uniform random variate.",
        Box::new(random),
    )?;
    Ok(())
}
