use std::path::{Path, PathBuf};
use std::{env, fs, io};

/// Lines of a corpus file, `\n` and `\r\n` endings stripped.
pub(crate) fn read_file<P: AsRef<Path>>(filename: P) -> io::Result<Vec<String>> {
	Ok(fs::read_to_string(filename)?.lines().map(str::to_owned).collect())
}

/// Sibling of `input_path` with its extension replaced, e.g. the model cache
/// `data/seuss.bin` for the corpus `data/seuss.dat`.
pub(crate) fn build_output_path<P: AsRef<Path>>(input_path: P, extension: &str) -> io::Result<PathBuf> {
	let input_path = input_path.as_ref();
	if input_path.file_stem().is_none() {
		return Err(io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"));
	}
	Ok(input_path.with_extension(extension))
}

/// Whether `path` was modified after `reference`.
pub(crate) fn is_newer<P: AsRef<Path>, R: AsRef<Path>>(path: P, reference: R) -> io::Result<bool> {
	let modified = fs::metadata(path)?.modified()?;
	let reference = fs::metadata(reference)?.modified()?;
	Ok(modified > reference)
}

/// Source id for a corpus file: its name without extension.
pub(crate) fn get_filename<P: AsRef<Path>>(input_path: P) -> io::Result<String> {
	input_path
		.as_ref()
		.file_stem()
		.map(|stem| stem.to_string_lossy().into_owned())
		.ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))
}

/// Corpus folder to search. `.` means the current directory, anything else is
/// used as given.
pub(crate) fn normalize_folder<P: AsRef<Path>>(input: P) -> PathBuf {
	let input = input.as_ref();
	if input == Path::new(".") || input == Path::new("./") {
		env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
	} else {
		input.to_path_buf()
	}
}

/// Sorted names (no paths) of the files in `dir` ending in `.<extension>`.
///
/// A missing directory yields an empty list.
pub(crate) fn list_files<P: AsRef<Path>>(dir: P, extension: &str) -> io::Result<Vec<String>> {
	let entries = match fs::read_dir(dir) {
		Ok(entries) => entries,
		Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
		Err(e) => return Err(e),
	};

	let mut files = Vec::new();
	for entry in entries {
		let path = entry?.path();
		let matches = path.extension().is_some_and(|ext| ext == extension);
		if let (true, true, Some(name)) = (matches, path.is_file(), path.file_name()) {
			files.push(name.to_string_lossy().into_owned());
		}
	}
	files.sort_unstable();
	Ok(files)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn output_path_swaps_extension() {
		assert_eq!(build_output_path("data/seuss.dat", "bin").unwrap(), PathBuf::from("data/seuss.bin"));
		assert_eq!(get_filename("./data/moby dick.dat").unwrap(), "moby dick");
	}

	#[test]
	fn lists_only_matching_files() {
		let dir = tempfile::tempdir().unwrap();
		fs::write(dir.path().join("b.dat"), "").unwrap();
		fs::write(dir.path().join("a.dat"), "").unwrap();
		fs::write(dir.path().join("a.bin"), "").unwrap();
		assert_eq!(list_files(dir.path(), "dat").unwrap(), vec!["a.dat", "b.dat"]);
		assert!(list_files(dir.path().join("missing"), "dat").unwrap().is_empty());
	}

	#[test]
	fn reads_lines() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("c.dat");
		fs::write(&path, "one\r\ntwo\n").unwrap();
		assert_eq!(read_file(&path).unwrap(), vec!["one", "two"]);
	}
}
