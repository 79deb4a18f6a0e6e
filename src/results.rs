/*!
Control the appearance of battle result data

# Examples

Creating a [`ResultsTable`] after running a battle:

```
use blockcraft::prelude::*;

let items = vec![
    Item::new("parent", 500, 500),
    Item::new("child", 500, 25_000).with_parents(["parent"]),
];

let output = Battle::builder()
    .capacity(1200)
    .build()
    .unwrap()
    .run(&items)
    .unwrap();

let table = ResultsTable::new(&output).format(Format::CSV);

println!("{}", table);
```
*/

use std::fmt::Display;

use crate::battle::BattleOutput;

/// Floating point precision of results data.
pub const FLOAT_PRECISION_DIGITS: usize = 4;

/// Describes the appearance of a [`ResultsTable`] table as given by its
/// [`Display`] implementation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Format {
    /// Comma-separated, without extra whitespace.
    CSV,
    /// Human-readable.
    #[default]
    PrettyPrint,
}

const COLUMNS: usize = 6;

/// Type of column that can appear in a results table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Selector,
    TotalFee,
    FeeDelta,
    TotalWeight,
    Fill,
    ItemsMined,
}

impl Column {
    /// Columns in the order they appear in results tables.
    const ALL: [Column; COLUMNS] = [
        Column::Selector,
        Column::TotalFee,
        Column::FeeDelta,
        Column::TotalWeight,
        Column::Fill,
        Column::ItemsMined,
    ];
}

/// Value which corresponds to a [`Column`].
#[derive(Debug, Clone)]
enum ColumnValue {
    Text(String),
    Int(u64),
    Delta(i128),
    Float(f64),
}

type Row = [String; COLUMNS];

/// One row per selector of a [`BattleOutput`]. The "Fee Delta" column is
/// relative to the first selector. The table is given by the struct's
/// [`Display`] implementation, as specified by its [`Format`].
pub struct ResultsTable {
    format: Format,
    header: Row,
    rows: Vec<Row>,
    /// Widest cell of each column, header included.
    widths: [usize; COLUMNS],
}

impl ResultsTable {
    const SEPARATOR_VERTICAL: char = '|';
    const SEPARATOR_HORIZONTAL: char = '-';

    pub fn new(output: &BattleOutput) -> Self {
        let baseline = output
            .entries
            .first()
            .map(|entry| entry.block.total_fee)
            .unwrap_or_default();

        let header: Row = Column::ALL.map(|column| column.to_string());
        let rows: Vec<Row> = output
            .entries
            .iter()
            .map(|entry| {
                let block = &entry.block;
                Column::ALL.map(|column| {
                    let value = match column {
                        Column::Selector => {
                            ColumnValue::Text(entry.selector.clone())
                        }
                        Column::TotalFee => ColumnValue::Int(block.total_fee),
                        Column::FeeDelta => ColumnValue::Delta(
                            block.total_fee as i128 - baseline as i128,
                        ),
                        Column::TotalWeight => {
                            ColumnValue::Int(block.total_weight)
                        }
                        Column::Fill => ColumnValue::Float(block.fill_ratio()),
                        Column::ItemsMined => {
                            ColumnValue::Int(block.len() as u64)
                        }
                    };
                    value.to_string()
                })
            })
            .collect();

        let mut widths = [0; COLUMNS];
        for row in std::iter::once(&header).chain(rows.iter()) {
            for (width, cell) in widths.iter_mut().zip(row.iter()) {
                *width = (*width).max(cell.len());
            }
        }

        ResultsTable {
            format: Format::default(),
            header,
            rows,
            widths,
        }
    }

    /// Specify the [`Format`] of the results table.
    pub fn format(mut self, format: Format) -> Self {
        self.format = format;

        self
    }

    pub fn set_format(&mut self, format: Format) {
        self.format = format;
    }

    fn write_row(
        &self,
        f: &mut std::fmt::Formatter<'_>,
        row: &Row,
    ) -> std::fmt::Result {
        match self.format {
            Format::CSV => write!(f, "{}", row.join(",")),
            Format::PrettyPrint => {
                for (cell, width) in row.iter().zip(self.widths) {
                    write!(
                        f,
                        " {:1$} {2}",
                        cell,
                        width,
                        Self::SEPARATOR_VERTICAL
                    )?;
                }

                Ok(())
            }
        }
    }
}

impl Display for ResultsTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.write_row(f, &self.header)?;

        if self.format == Format::PrettyPrint {
            let rule_width: usize = self.widths.iter().map(|w| w + 3).sum();
            writeln!(f)?;
            write!(
                f,
                "{}",
                Self::SEPARATOR_HORIZONTAL.to_string().repeat(rule_width)
            )?;
        }

        for row in self.rows.iter() {
            writeln!(f)?;
            self.write_row(f, row)?;
        }

        Ok(())
    }
}

impl Display for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self {
            Self::Selector => write!(f, "Selector"),
            Self::TotalFee => write!(f, "Total Fee"),
            Self::FeeDelta => write!(f, "Fee Delta"),
            Self::TotalWeight => write!(f, "Total Weight"),
            Self::Fill => write!(f, "Fill"),
            Self::ItemsMined => write!(f, "Items Mined"),
        }
    }
}

impl Display for ColumnValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self {
            Self::Text(text) => write!(f, "{}", text),
            Self::Int(value) => write!(f, "{}", value),
            Self::Delta(delta) => write!(f, "{:+}", delta),
            Self::Float(value) => {
                write!(f, "{:.1$}", value, FLOAT_PRECISION_DIGITS)
            }
        }
    }
}
