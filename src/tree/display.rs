//! Indented box-drawing rendering of a configuration tree.
//!
//! Child sections render before content lines, both in insertion order, so
//! the drawing is deterministic for a given load.

use crate::tree::section::{ConfigTree, SectionId};
use std::fmt;

const TRUNK: &str = " │ ";
const CORNER: &str = " └─";
const TEE: &str = " ├─";
const BLANK: &str = "   ";

impl ConfigTree {
	/// Render the subtree rooted at `at` as an indented tree drawing.
	pub fn render(&self, at: SectionId) -> String {
		let mut lines: Vec<(String, usize)> = Vec::new();
		self.collect_lines(at, 0, &mut lines);

		let max_level = lines.iter().map(|(_, level)| *level).max().unwrap_or(0);
		let mut grid: Vec<Vec<String>> =
			vec![vec![BLANK.to_string(); max_level + 1]; lines.len()];

		for (i, (_, level)) in lines.iter().enumerate() {
			grid[i][*level] = CORNER.to_string();
			for j in (0..i).rev() {
				let prev_level = lines[j].1;
				if prev_level > *level {
					grid[j][*level] = TRUNK.to_string();
				} else if prev_level == *level {
					grid[j][*level] = TEE.to_string();
					break;
				} else {
					break;
				}
			}
		}

		// The first row is the header; the first column only ever holds its
		// corner, so both are dropped from the drawing.
		let mut rendered = format!("{}\n", lines[0].0);
		let rows: Vec<String> = lines
			.iter()
			.enumerate()
			.skip(1)
			.map(|(i, (name, level))| {
				grid[i][*level].push_str(name);
				grid[i][1..].join("").trim_end().to_string()
			})
			.collect();
		rendered.push_str(&rows.join("\n"));
		rendered
	}

	fn collect_lines(&self, at: SectionId, level: usize, lines: &mut Vec<(String, usize)>) {
		lines.push((format!("{}{}", self.name(at), self.separator()), level));
		for child in self.children(at).collect::<Vec<_>>() {
			self.collect_lines(child, level + 1, lines);
		}
		for (key, value) in self.entries(at) {
			lines.push((format!("{key} = {value}"), level + 1));
		}
	}
}

impl fmt::Display for ConfigTree {
	fn fmt(&self, out: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(out, "{}", self.render(self.root()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::value::Value;

	#[test]
	fn test_render_single_section() {
		let tree = ConfigTree::new("top");
		assert_eq!(tree.render(tree.root()), "top/\n");
	}

	#[test]
	fn test_render_tree() {
		let mut tree = ConfigTree::new("top");
		let root = tree.root();
		let (a, _) = tree.ensure_path(root, "a").unwrap();
		let (b, _) = tree.ensure_path(root, "b").unwrap();
		tree.set_from(a, "x", Value::Int(1)).unwrap();
		tree.set_from(b, "y", Value::Float(2.5)).unwrap();

		let expected = "\
top/
 ├─a/
 │  └─x = 1
 └─b/
    └─y = 2.5";
		assert_eq!(tree.render(root), expected);
	}

	#[test]
	fn test_render_sections_before_content() {
		let mut tree = ConfigTree::new("top");
		let root = tree.root();
		tree.set_from(root, "width", Value::Int(2)).unwrap();
		let (det, _) = tree.ensure_path(root, "det1").unwrap();
		tree.set_from(det, "height", Value::Float(1.5)).unwrap();

		let expected = "\
top/
 ├─det1/
 │  └─height = 1.5
 └─width = 2";
		assert_eq!(tree.render(root), expected);
	}
}
