//! The category table: the single mutable source of truth of a session.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::category::Category;
use crate::error::{ModelError, ModelResult};

const REQUIRED_COLUMNS: [&str; 7] = ["colorname", "hc", "hr", "sc", "sr", "lc", "lr"];

/// Mapping from category name to prototype.
///
/// Iteration is in lexicographic name order. Nothing in scoring or learning
/// depends on that order except the documented tie-break of
/// [`ScoredTable::best`](crate::scoring::ScoredTable::best).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryModel {
    categories: BTreeMap<String, Category>,
}

impl CategoryModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a category, returning the previous prototype.
    pub fn insert(&mut self, name: impl Into<String>, category: Category) -> Option<Category> {
        self.categories.insert(name.into(), category)
    }

    pub fn get(&self, name: &str) -> Option<&Category> {
        self.categories.get(name)
    }

    /// Looks a category up, failing with `UnknownCategory`.
    pub fn require(&self, name: &str) -> ModelResult<&Category> {
        self.categories
            .get(name)
            .ok_or_else(|| ModelError::unknown_category(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.categories.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Category)> {
        self.categories.iter().map(|(name, cat)| (name.as_str(), cat))
    }

    /// Adds `amount` to the diversity bias of `name`, returning the new value.
    pub fn bump_diversity(&mut self, name: &str, amount: f64) -> ModelResult<f64> {
        let category = self
            .categories
            .get_mut(name)
            .ok_or_else(|| ModelError::unknown_category(name))?;
        category.bump_diversity(amount);
        Ok(category.add_diversity())
    }

    /// Replaces the prototypes of the given rows in one step.
    ///
    /// Every name is checked before anything is written, so either all rows
    /// are updated or none is. Diversity biases are preserved.
    pub fn commit_rows(&mut self, rows: &[(String, Category)]) -> ModelResult<()> {
        if let Some((missing, _)) = rows.iter().find(|(name, _)| !self.contains(name)) {
            return Err(ModelError::unknown_category(missing.clone()));
        }
        for (name, prototype) in rows {
            if let Some(current) = self.categories.get_mut(name) {
                current.adopt_prototype(prototype);
            }
        }
        Ok(())
    }

    /// Parses a preset table with the columns `colorname,hc,hr,sc,sr,lc,lr`
    /// and an optional `add_diversity` column. An empty `hc` cell marks a
    /// hue-agnostic category.
    pub fn from_csv_str(text: &str) -> ModelResult<Self> {
        let mut lines = text
            .lines()
            .enumerate()
            .map(|(idx, line)| (idx + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'));

        let (header_line, header) = lines
            .next()
            .ok_or_else(|| ModelError::parse(0, "missing header row"))?;
        let columns: Vec<&str> = header.split(',').map(str::trim).collect();
        let mut positions = [0usize; 7];
        for (slot, required) in REQUIRED_COLUMNS.iter().enumerate() {
            positions[slot] = columns
                .iter()
                .position(|column| column == required)
                .ok_or_else(|| {
                    ModelError::parse(header_line, format!("missing column '{}'", required))
                })?;
        }
        let diversity_position = columns.iter().position(|column| *column == "add_diversity");

        let mut model = Self::new();
        for (line_no, line) in lines {
            let cells: Vec<&str> = line.split(',').map(str::trim).collect();
            if cells.len() != columns.len() {
                return Err(ModelError::parse(
                    line_no,
                    format!("expected {} cells, found {}", columns.len(), cells.len()),
                ));
            }
            let name = cells[positions[0]];
            if name.is_empty() {
                return Err(ModelError::parse(line_no, "empty category name"));
            }
            let number = |slot: usize| -> ModelResult<f64> {
                let cell = cells[positions[slot]];
                cell.parse::<f64>().map_err(|_| {
                    ModelError::parse(
                        line_no,
                        format!("{} must be a number, found '{}'", REQUIRED_COLUMNS[slot], cell),
                    )
                })
            };
            let hc = if cells[positions[1]].is_empty() || cells[positions[1]] == "NaN" {
                None
            } else {
                Some(number(1)?)
            };
            let category = Category::new(
                hc,
                number(2)?,
                number(3)?,
                number(4)?,
                number(5)?,
                number(6)?,
            )
            .map_err(|err| match err {
                ModelError::DegenerateRadius {
                    parameter, value, ..
                } => ModelError::degenerate_radius(name, parameter, value),
                other => other,
            })?;
            let add_diversity = match diversity_position.map(|pos| cells[pos]) {
                Some(cell) if !cell.is_empty() => cell.parse::<f64>().map_err(|_| {
                    ModelError::parse(
                        line_no,
                        format!("add_diversity must be a number, found '{}'", cell),
                    )
                })?,
                _ => 0.0,
            };
            if model
                .insert(name, category.with_diversity(add_diversity))
                .is_some()
            {
                return Err(ModelError::parse(
                    line_no,
                    format!("duplicate category '{}'", name),
                ));
            }
        }
        Ok(model)
    }

    pub fn load_csv<P: AsRef<Path>>(path: P) -> ModelResult<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_csv_str(&contents)
    }

    /// Serialises the six prototype columns keyed by category name.
    pub fn to_csv_string(&self) -> String {
        let mut rows = vec![REQUIRED_COLUMNS.join(",")];
        for (name, cat) in self.iter() {
            let hc = cat.hc().map(|h| h.to_string()).unwrap_or_default();
            rows.push(format!(
                "{},{},{},{},{},{},{}",
                name,
                hc,
                cat.hr(),
                cat.sc(),
                cat.sr(),
                cat.lc(),
                cat.lr()
            ));
        }
        let mut csv = rows.join("\n");
        csv.push('\n');
        csv
    }

    pub fn save_csv<P: AsRef<Path>>(&self, path: P) -> ModelResult<()> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, self.to_csv_string())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRESET: &str = "\
colorname,hc,hr,sc,sr,lc,lr
red,0,20,90,10,50,15
yellow,50,20,90,10,50,15
grey,,10,5,5,50,20
";

    #[test]
    fn parses_preset_with_hue_agnostic_row() {
        let model = CategoryModel::from_csv_str(PRESET).unwrap();
        assert_eq!(model.len(), 3);
        assert!(model.get("grey").unwrap().is_hue_agnostic());
        assert_eq!(model.get("yellow").unwrap().hc(), Some(50.0));
        let names: Vec<&str> = model.names().collect();
        assert_eq!(names, vec!["grey", "red", "yellow"]);
    }

    #[test]
    fn csv_export_reimports_identically() {
        let model = CategoryModel::from_csv_str(PRESET).unwrap();
        let again = CategoryModel::from_csv_str(&model.to_csv_string()).unwrap();
        assert_eq!(model, again);
    }

    #[test]
    fn rejects_missing_column_and_duplicates() {
        let err = CategoryModel::from_csv_str("colorname,hc,hr\nred,0,20").unwrap_err();
        assert!(matches!(err, ModelError::Parse { .. }));

        let dup = format!("{}red,10,20,90,10,50,15\n", PRESET);
        assert!(CategoryModel::from_csv_str(&dup).is_err());
    }

    #[test]
    fn degenerate_radius_names_the_category() {
        let err = CategoryModel::from_csv_str("colorname,hc,hr,sc,sr,lc,lr\nblue,240,0,90,10,50,15")
            .unwrap_err();
        assert_eq!(err, ModelError::degenerate_radius("blue", "hr", 0.0));
    }

    #[test]
    fn oversized_radius_is_refused_on_import() {
        let err = CategoryModel::from_csv_str("colorname,hc,hr,sc,sr,lc,lr\ngrey,,200,10,120,55,20")
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidParameter { .. }));
    }

    #[test]
    fn commit_rows_is_all_or_nothing() {
        let mut model = CategoryModel::from_csv_str(PRESET).unwrap();
        let before = model.clone();
        let moved = Category::clamped(Some(10.0), 20.0, 90.0, 10.0, 50.0, 15.0);
        let rows = vec![
            ("red".to_string(), moved.clone()),
            ("mauve".to_string(), moved),
        ];
        assert!(model.commit_rows(&rows).is_err());
        assert_eq!(model, before);
    }

    #[test]
    fn commit_rows_keeps_diversity() {
        let mut model = CategoryModel::from_csv_str(PRESET).unwrap();
        model.bump_diversity("red", 5.0).unwrap();
        let moved = Category::clamped(Some(10.0), 20.0, 90.0, 10.0, 50.0, 15.0);
        model.commit_rows(&[("red".to_string(), moved)]).unwrap();
        let red = model.get("red").unwrap();
        assert_eq!(red.hc(), Some(10.0));
        assert_eq!(red.add_diversity(), 5.0);
    }

    #[test]
    fn bump_diversity_unknown_category_fails() {
        let mut model = CategoryModel::from_csv_str(PRESET).unwrap();
        assert_eq!(
            model.bump_diversity("mauve", 5.0),
            Err(ModelError::unknown_category("mauve"))
        );
    }
}
