/*!

This is the long-form manual for `booth_tally` and `form20`.

## What it does

A Form 20 document lists, for one assembly constituency, the votes of every
candidate at every polling station. `form20` takes the tables found on the
pages of such documents and produces per-booth records, a competitiveness tier
for every booth, constituency summaries and, between two elections, the swing
of each party booth by booth.

## Input formats

The table extraction from PDF is not done here: the inputs are the page tables
already extracted, in one of these formats:
* `json` a document with one entry per page
* `csv` all the pages flattened in a single file
* `xlsx` an Excel workbook with one worksheet per page

### `json`

```json
{"pages": [
  {"number": 1, "title": "FORM 20 ... 036- Uthiramerur", "table": [
    ["Sl. No.", "Polling Station No.", "", "", ""],
    [null, null, "Anbu", "Bala", ""],
    [null, null, "Dravida Munnetra Kazhagam", "All India Anna Dravida Munnetra Kazhagam", "Total"],
    ["1", "12", 100, 80, 180]
  ]},
  {"number": 2, "table": null}
]}
```

The `title` is optional. A page with a `null` table is a page where nothing was
found; it is counted and skipped.

### `csv`

Every line starts with the page number, the other fields are the cells of one
row. A line with only a page number is a page without table. The title of a
page can be given with a line `title,<page>,<text>`.

### `xlsx`

One worksheet per page, in page order. An empty worksheet is a page without
table.

## How the tables are read

The second and third rows of the first page with a table hold the candidate
names and the party names. The party names are matched against a dictionary of
the parties of Tamil Nadu (`parties::PARTY_TABLE`), which also recognises the
mirrored text produced by some extractors. Unknown names become `Other`, blank
ones `Unknown`. The trailing columns without party (valid votes, rejected,
total, tendered) are the booth totals.

Every other row is either a header, a total row (any cell with the word
"Total"), an artifact (the column numbering "1 2 3 ...", blank rows) or a data
row, which starts with a table number. Data rows are grouped by the digits of
their polling station number: "5" and "5 (M)" are the same booth and their
votes are added.

## Competitiveness

In every booth the two parties with the most votes are compared. With `W` and
`R` their votes, the margin is `(W - R) / (W + R) * 100`:
* below 5: `SWING`
* below 10: `LEAN`
* otherwise `STRONG`

When tracked parties are configured, only they are ranked.

## Configuration file

```json
{
  "outputSettings": {
    "outputDirectory": "output",
    "electionName": "Tamil Nadu Legislative Assembly",
    "electionYear": 2021
  },
  "documents": [
    {
      "provider": "json",
      "filePath": "AC036.json",
      "constituencyNumber": 36,
      "constituencyName": "Uthiramerur",
      "trackedParties": ["DMK", "AIADMK"],
      "stationsPath": "AC036_stations.csv",
      "fallbackCenter": [12.61, 79.75]
    }
  ],
  "comparisons": [
    {
      "name": "Uthiramerur",
      "before": "output/AC036_2016_booths.csv",
      "after": "output/AC036_Uthiramerur_booths.csv",
      "beforeLabel": "2016",
      "afterLabel": "2021",
      "parties": [
        {"name": "DMK", "before": ["DMK"], "after": ["DMK"]},
        {"name": "AIADMK+", "before": ["AIADMK"], "after": ["AIADMK", "PMK"]}
      ]
    }
  ],
  "geocoding": {
    "gazetteerPath": "gazetteer.csv",
    "regionSuffix": "Kanchipuram, Tamil Nadu, India",
    "ratePerSecond": 1,
    "burst": 1,
    "maxLookups": 500
  }
}
```

All the paths are relative to the configuration file. Every document is
processed on its own: a document that fails is reported in the batch summary
and the others go on.

When `parties` is absent from a comparison, every party present in both
extracts is compared with itself. Alliances are never guessed.

## Outputs

For each document, in the output directory:
* `AC<number>_<name>_booths.csv` the booth records. This file can be used as
  the input of a comparison.
* `AC<number>_<name>_summary.json` the columns, the booths with their tier, the
  constituency summary and the extraction statistics
* `AC<number>_<name>_geocoded.json` the location of the polling stations, if
  they were geocoded

When two documents of a batch would get the same `AC<number>_<name>` (the
sheets of two elections for one constituency, or documents without number nor
title), the second one gets the name of its input file appended:
`AC036_Uthiramerur_ac036_2016_booths.csv`. The `files` of each document in the
batch summary give the actual names.

For each comparison: `<name>_comparison.csv` and `<name>_comparison.json`.
Shares, swings and turnout changes are in percent, rounded to 2 decimals.

`batch_summary.json` lists the outcome of every document and comparison.

*/
