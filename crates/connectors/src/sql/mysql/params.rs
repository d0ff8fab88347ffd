use crate::marshal::native_to_json;
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use model::core::value::{Value, hex_encode};
use mysql_async::Value as MySqlValue;
use mysql_common::params::Params;

pub struct MySqlParam(MySqlValue);

impl MySqlParam {
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Int(i) => MySqlParam(MySqlValue::Int(i)),
            Value::Uint(u) => MySqlParam(MySqlValue::UInt(u)),
            Value::Float(f) => MySqlParam(MySqlValue::Double(f)),
            Value::Decimal(d) => MySqlParam(MySqlValue::Bytes(d.to_plain_string().into_bytes())),
            Value::String(s) => MySqlParam(MySqlValue::Bytes(s.into_bytes())),
            Value::Boolean(b) => MySqlParam(MySqlValue::Int(i64::from(b))),
            Value::Json(j) => MySqlParam(MySqlValue::Bytes(j.to_string().into_bytes())),
            Value::Uuid(u) => MySqlParam(MySqlValue::Bytes(u.to_string().into_bytes())),
            Value::Bytes(b) => MySqlParam(MySqlValue::Bytes(b)),
            Value::Date(d) => MySqlParam(date_value(d, NaiveTime::MIN)),
            Value::Time(t) => MySqlParam(MySqlValue::Time(
                false,
                0,
                t.hour() as u8,
                t.minute() as u8,
                t.second() as u8,
                t.nanosecond() / 1_000,
            )),
            Value::Timestamp(ts) => MySqlParam(datetime_value(ts.naive_utc())),
            Value::TimestampNaive(ts) => MySqlParam(datetime_value(ts)),
            Value::ObjectId(oid) => MySqlParam(MySqlValue::Bytes(hex_encode(&oid).into_bytes())),
            Value::List(items) => MySqlParam(MySqlValue::Bytes(
                native_to_json(Value::List(items)).to_string().into_bytes(),
            )),
            Value::Null => MySqlParam(MySqlValue::NULL),
        }
    }
}

fn datetime_value(ts: NaiveDateTime) -> MySqlValue {
    date_value(ts.date(), ts.time())
}

fn date_value(date: NaiveDate, time: NaiveTime) -> MySqlValue {
    MySqlValue::Date(
        date.year() as u16,
        date.month() as u8,
        date.day() as u8,
        time.hour() as u8,
        time.minute() as u8,
        time.second() as u8,
        time.nanosecond() / 1_000,
    )
}

pub struct MySqlParamStore {
    pub params: Vec<MySqlParam>,
}

impl MySqlParamStore {
    pub fn from_values(values: Vec<Value>) -> Self {
        let params = values.into_iter().map(MySqlParam::from_value).collect();
        MySqlParamStore { params }
    }

    pub fn params(self) -> Params {
        if self.params.is_empty() {
            return Params::Empty;
        }
        Params::Positional(self.params.into_iter().map(|p| p.0).collect())
    }
}
