//! Sentinel replacement: literal "missing" markers become genuine nulls.

use crate::error::Result;
use polars::prelude::*;

/// Replace every occurrence of a sentinel marker (e.g. `"na"`) in string
/// columns with a null. Values are replaced, never deleted, so the row count
/// is untouched.
pub fn replace_invalid_markers(mut df: DataFrame, markers: &[String]) -> Result<DataFrame> {
    let col_names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();

    for name in col_names {
        let series = df.column(&name)?.as_materialized_series().clone();
        if !matches!(series.dtype(), DataType::String) {
            continue;
        }

        let ca = series.str()?;
        let replaced: StringChunked = ca
            .into_iter()
            .map(|opt| {
                opt.and_then(|v| {
                    let trimmed = v.trim();
                    if markers.iter().any(|m| m == trimmed) {
                        None
                    } else {
                        Some(v)
                    }
                })
            })
            .collect();

        let mut replaced = replaced.into_series();
        replaced.rename(name.as_str().into());
        df.replace(&name, replaced)?;
    }

    Ok(df)
}
