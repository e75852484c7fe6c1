use clap::Parser;

/// Booth-level extraction and analysis of Form 20 election result tables.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) A JSON batch configuration listing the documents, comparisons and geocoding
    /// settings of a run. See the documentation of the booth_tally::manual module for the format.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path) A reference JSON summary. If provided, form20 checks that the produced summary
    /// (the batch summary with --config, the constituency summary with --input) matches it.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (directory, 'stdout' or empty) With --input, the directory where the extract and the summary are
    /// written. If empty or 'stdout', only the summary is printed.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path) A single document to process instead of a batch configuration.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (default json) The type of the input: json, csv or xlsx.
    #[clap(long, value_parser)]
    pub input_type: Option<String>,

    /// The constituency number of the input (e.g. 36). Read from the title of the first page if absent.
    #[clap(long, value_parser)]
    pub constituency_number: Option<String>,

    /// The constituency name of the input. Read from the title of the first page if absent.
    #[clap(long, value_parser)]
    pub constituency_name: Option<String>,

    /// (repeatable) A party label used when ranking the parties of a booth, e.g. --tracked-party DMK
    /// --tracked-party AIADMK. By default every party of the document is ranked.
    #[clap(long, value_parser)]
    pub tracked_party: Vec<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
